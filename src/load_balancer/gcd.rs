// src/load_balancer/gcd.rs
use crate::error::{DispatchError, Result};

/// Greatest common divisor by the Euclidean algorithm; `gcd(a, 0) == a`.
pub fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

/// Left fold of [`gcd`] over `values`.
pub fn gcd_of_many(values: &[u32]) -> Result<u32> {
    let (first, rest) = values
        .split_first()
        .ok_or_else(|| DispatchError::invalid_input("cannot take the gcd of an empty list"))?;
    Ok(rest.iter().fold(*first, |acc, &value| gcd(acc, value)))
}
