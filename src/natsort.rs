use std::cmp::Ordering;

/// Sorts file names by their embedded numeric sequence instead of
/// lexically. Gallery extractors number artifacts without zero
/// padding, so `id_2.jpg` has to come before `id_10.jpg`.
pub fn natural_sort(names: &mut [String]) {
    names.sort_by(|a, b| natural_cmp(a, b));
}

fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = runs(a);
    let mut right = runs(b);

    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => match x.cmp(&y) {
                Ordering::Equal => continue,
                other => return other,
            },
        }
    }
}

/// One maximal digit or non-digit run of a name. Number runs compare
/// as integers, text runs lexically; a number run sorts before any
/// text run at the same position.
#[derive(PartialEq, Eq, PartialOrd, Ord)]
enum Run<'a> {
    Number(u128),
    Text(&'a str),
}

fn runs(s: &str) -> impl Iterator<Item = Run<'_>> {
    let mut rest = s;

    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }

        let is_digit = rest.chars().next().map(|c| c.is_ascii_digit())?;
        let len = rest
            .find(|c: char| c.is_ascii_digit() != is_digit)
            .unwrap_or(rest.len());
        let (run, tail) = rest.split_at(len);
        rest = tail;

        if is_digit {
            // Digit runs longer than a u128 don't occur in practice;
            // fall back to lexical comparison if parsing fails.
            Some(run.parse().map(Run::Number).unwrap_or(Run::Text(run)))
        } else {
            Some(Run::Text(run))
        }
    })
}
