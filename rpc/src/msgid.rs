//! Thread-local 20-decimal-digit message identifier generator.
//!
//! Each thread keeps its own counter, seeded from the OS's secure random source, and
//! increments it with carry on every call. A counter that reaches its maximum value
//! (twenty nines) reseeds from the OS rather than wrapping, so msg-ids never repeat
//! within a thread's lifetime short of exhausting the random seed space.

use std::cell::RefCell;

use rand::rngs::OsRng;
use rand::RngCore;

const MSG_ID_LEN: usize = 20;

thread_local! {
    static CURRENT: RefCell<Option<Vec<u8>>> = const { RefCell::new(None) };
}

/// Generates the next msg-id for the calling thread.
pub fn generate() -> String {
    CURRENT.with(|cell| {
        let mut slot = cell.borrow_mut();
        let needs_seed = match slot.as_ref() {
            None => true,
            Some(digits) => digits.iter().all(|&d| d == 9),
        };

        if needs_seed {
            *slot = Some(seed_digits());
        } else if let Some(digits) = slot.as_mut() {
            increment_with_carry(digits);
        }

        digits_to_string(slot.as_ref().unwrap())
    })
}

fn seed_digits() -> Vec<u8> {
    let mut bytes = [0u8; MSG_ID_LEN];
    OsRng.fill_bytes(&mut bytes);
    bytes.iter().map(|b| b % 10).collect()
}

fn increment_with_carry(digits: &mut [u8]) {
    let mut carry = 1u8;
    for digit in digits.iter_mut().rev() {
        if carry == 0 {
            break;
        }
        let sum = *digit + carry;
        *digit = sum % 10;
        carry = sum / 10;
    }
}

fn digits_to_string(digits: &[u8]) -> String {
    digits.iter().map(|d| (b'0' + d) as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_twenty_digit_strings() {
        let id = generate();
        assert_eq!(id.len(), MSG_ID_LEN);
        assert!(id.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn consecutive_ids_increase() {
        // Reseed boundaries are astronomically unlikely across two calls, so this
        // holds except right at an exhausted-counter reseed.
        let first = generate();
        let second = generate();
        assert!(second >= first);
    }

    #[test]
    fn increment_carries_across_all_nines() {
        let mut digits = vec![9u8; MSG_ID_LEN];
        increment_with_carry(&mut digits);
        assert_eq!(digits, vec![0u8; MSG_ID_LEN]);
    }

    #[test]
    fn increment_without_carry_only_touches_last_digit() {
        let mut digits = vec![0u8; MSG_ID_LEN];
        increment_with_carry(&mut digits);
        assert_eq!(digits[MSG_ID_LEN - 1], 1);
        assert!(digits[..MSG_ID_LEN - 1].iter().all(|&d| d == 0));
    }
}
