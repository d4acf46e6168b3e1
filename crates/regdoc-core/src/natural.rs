//! Numeric-aware string ordering.
//!
//! Section codes such as `4.10` and `4.2`, or reference codes with numeric
//! suffixes, must sort the way a reader expects: embedded digit runs compare
//! by value, everything else compares case-insensitively.

use std::{cmp::Ordering, iter::Peekable, str::Chars};

/// Compare two strings treating each run of ASCII digits as a number.
///
/// `"2" < "10"`, `"A2" < "a10"`, `"4.2" < "4.10"`. Strings that compare equal
/// under these rules (e.g. `"a"` and `"A"`, or `"01"` and `"1"`) fall back to
/// plain byte order so the result is a total order.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
  let mut left = a.chars().peekable();
  let mut right = b.chars().peekable();

  loop {
    match (left.peek().copied(), right.peek().copied()) {
      (None, None) => return a.cmp(b),
      (None, Some(_)) => return Ordering::Less,
      (Some(_), None) => return Ordering::Greater,
      (Some(l), Some(r)) if l.is_ascii_digit() && r.is_ascii_digit() => {
        let l_run = take_digits(&mut left);
        let r_run = take_digits(&mut right);
        match compare_digit_runs(&l_run, &r_run) {
          Ordering::Equal => {}
          other => return other,
        }
      }
      (Some(l), Some(r)) => {
        left.next();
        right.next();
        let ord = l.to_lowercase().cmp(r.to_lowercase());
        if ord != Ordering::Equal {
          return ord;
        }
      }
    }
  }
}

fn take_digits(chars: &mut Peekable<Chars<'_>>) -> String {
  let mut run = String::new();
  while let Some(c) = chars.peek().copied() {
    if !c.is_ascii_digit() {
      break;
    }
    run.push(c);
    chars.next();
  }
  run
}

/// Compare digit runs by value without parsing, so arbitrarily long runs
/// cannot overflow.
fn compare_digit_runs(a: &str, b: &str) -> Ordering {
  let a = a.trim_start_matches('0');
  let b = b.trim_start_matches('0');
  a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}
