//! Data model of admin alerts: identifiers, types, priorities, quick actions,
//! and the loosely-typed records from which alerts are classified.
mod alert;
mod id;
mod quick_action;
mod record;

pub use alert::{Alert, AlertState, AlertType, ArgsObject, Priority, Resolution};
pub use id::Id;
pub use quick_action::{ActionKind, QuickAction};
pub use record::{AlertRecord, QuickActionRecord, RecordError, UnknownPriorityPolicy};

use caseless::Caseless;
use unicode_normalization::UnicodeNormalization;

/// Collate characters for caseless matching: case-folded and unicode-normalized,
/// as "default caseless matching" of the Unicode standard (section 3.13).
pub fn collate<I>(i: I) -> impl Iterator<Item = char>
where
    I: Iterator<Item = char>,
{
    i.nfd().default_case_fold().nfkc()
}

#[cfg(test)]
mod test {
    use super::collate;

    #[test]
    fn test_collation_cases() {
        let table = vec![
            ("", ""),
            ("Laptop", "laptop"),
            ("MacBook PRO 14\"", "macbook pro 14\""),
            ("Straße", "strasse"),
            // The uppercase 'È' is composed of ascii 'E' (\u{0045}), plus the
            // combining diacritic '\u{0300}'. The lowercase version 'è' is
            // represented by its own code point.
            ("Caf\u{0045}\u{0300}", "caf\u{00e8}"),
        ];

        for (input, expect) in table {
            assert_eq!(collate(input.chars()).collect::<String>().as_str(), expect);
        }
    }
}
