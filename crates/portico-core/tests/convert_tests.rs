//! Value converter tests: scalar round trips, array decoding, and failure
//! modes for malformed text.

use portico_core::{ConvertError, ParamType, Value, convert};

// ─────────────────────────────────────────────────────────────────────────────
// Scalar conversions
// ─────────────────────────────────────────────────────────────────────────────

mod scalars {
    use super::*;

    #[test]
    fn text_passes_through() {
        let value = convert("hello world", &ParamType::Text).unwrap();
        assert_eq!(value, Value::Text("hello world".into()));
        assert_eq!(value.to_string(), "hello world");
    }

    #[test]
    fn int_round_trip() {
        for text in ["0", "42", "-17", "9223372036854775807"] {
            let value = convert(text, &ParamType::Int).unwrap();
            assert_eq!(value.to_string(), text);
        }
        assert_eq!(convert("42", &ParamType::Int).unwrap().as_int(), Some(42));
    }

    #[test]
    fn malformed_int_fails() {
        let err = convert("forty-two", &ParamType::Int).unwrap_err();
        assert!(matches!(err, ConvertError::Parse { .. }));

        let err = convert("", &ParamType::Int).unwrap_err();
        assert!(matches!(err, ConvertError::Parse { .. }));
    }

    #[test]
    fn uri_round_trip() {
        let value = convert("/api/v1/items?page=2", &ParamType::Uri).unwrap();
        assert_eq!(value.to_string(), "/api/v1/items?page=2");
    }

    #[test]
    fn malformed_uri_fails() {
        let err = convert("http://[broken", &ParamType::Uri).unwrap_err();
        assert!(matches!(err, ConvertError::Parse { .. }));
    }

    #[test]
    fn url_round_trip() {
        let value = convert("https://example.com/things", &ParamType::Url).unwrap();
        assert_eq!(value.to_string(), "https://example.com/things");
    }

    #[test]
    fn relative_url_fails() {
        // A URL must be absolute; a bare path is only a URI.
        let err = convert("/just/a/path", &ParamType::Url).unwrap_err();
        assert!(matches!(err, ConvertError::Parse { .. }));
    }

    #[test]
    fn path_round_trip() {
        let value = convert("/tmp/data.txt", &ParamType::Path).unwrap();
        assert_eq!(
            value.as_path(),
            Some(std::path::Path::new("/tmp/data.txt"))
        );
        assert_eq!(value.to_string(), "/tmp/data.txt");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Array conversions
// ─────────────────────────────────────────────────────────────────────────────

mod arrays {
    use super::*;

    #[test]
    fn int_array_preserves_order_and_length() {
        let value = convert(r#"["3","1","2"]"#, &ParamType::array(ParamType::Int)).unwrap();
        assert_eq!(
            value,
            Value::Array(vec![Value::Int(3), Value::Int(1), Value::Int(2)])
        );
    }

    #[test]
    fn empty_array() {
        let value = convert("[]", &ParamType::array(ParamType::Text)).unwrap();
        assert_eq!(value, Value::Array(Vec::new()));
    }

    #[test]
    fn array_round_trip_via_display() {
        let text = r#"["1","2","3"]"#;
        let value = convert(text, &ParamType::array(ParamType::Int)).unwrap();
        assert_eq!(value.to_string(), text);
    }

    #[test]
    fn nested_arrays_convert_recursively() {
        let target = ParamType::array(ParamType::array(ParamType::Int));
        let value = convert(r#"["[\"1\",\"2\"]","[\"3\"]"]"#, &target).unwrap();
        assert_eq!(
            value,
            Value::Array(vec![
                Value::Array(vec![Value::Int(1), Value::Int(2)]),
                Value::Array(vec![Value::Int(3)]),
            ])
        );
    }

    #[test]
    fn malformed_array_text_fails() {
        let err = convert("not an array", &ParamType::array(ParamType::Int)).unwrap_err();
        assert!(matches!(err, ConvertError::Array { .. }));
    }

    #[test]
    fn element_conversion_failure_fails_the_array() {
        let err = convert(r#"["1","x","3"]"#, &ParamType::array(ParamType::Int)).unwrap_err();
        assert!(matches!(err, ConvertError::Parse { .. }));
    }
}
