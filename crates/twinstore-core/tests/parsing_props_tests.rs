use proptest::prelude::*;
use twinstore_core::model::catalog;
use twinstore_core::{FieldType, Mode, Value};

fn mode_spelling() -> impl Strategy<Value = (Mode, String)> {
    (
        prop::sample::select(Mode::ALL.to_vec()),
        prop::collection::vec(any::<bool>(), 9),
        " {0,2}",
        " {0,2}",
    )
        .prop_map(|(mode, upper, pre, post)| {
            let word: String = mode
                .as_str()
                .chars()
                .zip(upper.iter().cycle())
                .map(|(c, up)| if *up { c.to_ascii_uppercase() } else { c })
                .collect();
            (mode, format!("{}{}{}", pre, word, post))
        })
}

proptest! {
    #[test]
    fn mode_parsing_ignores_case_and_padding((mode, spelled) in mode_spelling()) {
        prop_assert_eq!(spelled.parse::<Mode>(), Ok(mode));
    }

    #[test]
    fn unknown_mode_strings_are_rejected(s in "[a-z]{1,12}") {
        prop_assume!(!["primary", "secondary", "dual"].contains(&s.as_str()));
        prop_assert!(s.parse::<Mode>().is_err());
    }

    #[test]
    fn integers_parse_and_display_back(i in any::<i64>()) {
        let v = Value::parse(FieldType::Int64, &i.to_string()).unwrap();
        prop_assert_eq!(v.to_string(), i.to_string());
        prop_assert!(v.fits(FieldType::Int64));
    }

    #[test]
    fn finite_floats_parse(f in -1.0e12f64..1.0e12f64) {
        let v = Value::parse(FieldType::Float64, &f.to_string()).unwrap();
        prop_assert_eq!(v, Value::Float(f));
    }

    #[test]
    fn dates_parse_from_iso(y in 1970i32..2100, m in 1u32..=12, d in 1u32..=28) {
        let raw = format!("{:04}-{:02}-{:02}", y, m, d);
        let v = Value::parse(FieldType::Date, &raw).unwrap();
        prop_assert_eq!(v.to_string(), raw);
    }

    #[test]
    fn parsed_values_always_fit_their_type(raw in "[0-9a-z.-]{0,12}") {
        for ty in [FieldType::Int64, FieldType::Float64, FieldType::String, FieldType::Date] {
            if let Ok(v) = Value::parse(ty, &raw) {
                prop_assert!(v.fits(ty));
            }
        }
    }

    #[test]
    fn entity_lookup_is_case_insensitive(idx in 0usize..4, upper in any::<bool>()) {
        let spec = catalog::all()[idx];
        let name = if upper { spec.table.to_ascii_uppercase() } else { spec.name.to_string() };
        prop_assert_eq!(catalog::entity(&name).map(|e| e.name), Ok(spec.name));
    }
}
