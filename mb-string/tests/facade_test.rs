use std::ops::Range;
use std::sync::Arc;

use mb_string::{Backend, MbConfig, MbError, MbString, Registry, Strictness};

const TEXT: &str = "订单已支付，谢谢惠顾！";

#[test]
fn native_backend_counts_characters() {
    let mb = MbString::default();
    assert_eq!(mb.backend_name(), "native");
    assert_eq!(mb.strlen(TEXT).unwrap(), 11);
}

#[test]
fn bytes_backend_counts_bytes() {
    let mb = MbString::default().using("bytes");
    assert_eq!(mb.strlen(TEXT).unwrap(), TEXT.len());
}

#[test]
fn strpos_and_strrpos_find_first_and_last() {
    let mb = MbString::default();
    let haystack = "ab价ab价ab";

    assert_eq!(mb.strpos(haystack, "价", 0).unwrap(), Some(2));
    assert_eq!(mb.strpos(haystack, "价", 3).unwrap(), Some(5));
    assert_eq!(mb.strpos(haystack, "价", 6).unwrap(), None);
    assert_eq!(mb.strpos(haystack, "价", -2).unwrap(), None);
    assert_eq!(mb.strpos(haystack, "价", -4).unwrap(), Some(5));

    assert_eq!(mb.strrpos(haystack, "ab", 0).unwrap(), Some(6));
    assert_eq!(mb.strrpos(haystack, "ab", -3).unwrap(), Some(3));
    assert_eq!(mb.strrpos(haystack, "zz", 0).unwrap(), None);
}

#[test]
fn out_of_range_offsets_return_none() {
    let mb = MbString::default();
    assert_eq!(mb.strpos("abc", "a", 4).unwrap(), None);
    assert_eq!(mb.strpos("abc", "a", -4).unwrap(), None);
    assert_eq!(mb.strrpos("abc", "a", 9).unwrap(), None);
}

#[test]
fn substr_follows_negative_start_and_length_rules() {
    let mb = MbString::default();

    assert_eq!(mb.substr(TEXT, 0, Some(2)).unwrap(), "订单".as_bytes());
    assert_eq!(mb.substr(TEXT, -3, None).unwrap(), "惠顾！".as_bytes());
    assert_eq!(mb.substr(TEXT, 2, Some(-6)).unwrap(), "已支付".as_bytes());
    assert_eq!(mb.substr(TEXT, -100, Some(1)).unwrap(), "订".as_bytes());
    assert!(mb.substr(TEXT, 11, None).unwrap().is_empty());
    assert!(mb.substr(TEXT, 5, Some(-8)).unwrap().is_empty());
}

#[test]
fn substr_with_huge_length_takes_the_rest() {
    let mb = MbString::default();

    assert_eq!(mb.substr("abcdef", 1, Some(isize::MAX)).unwrap(), b"bcdef");
    assert_eq!(mb.substr(TEXT, -3, Some(isize::MAX)).unwrap(), "惠顾！".as_bytes());
    assert_eq!(
        mb.using("bytes").substr("abcdef", 4, Some(isize::MAX)).unwrap(),
        b"ef"
    );
}

#[test]
fn utf8_checks_forward_through_facade() {
    let mb = MbString::default();
    assert!(mb.is_utf8(TEXT, Strictness::Strict).unwrap());
    assert!(!mb.is_utf8([0xED, 0xA0, 0x80], Strictness::Strict).unwrap());
    assert!(mb.is_utf8([0xED, 0xA0, 0x80], Strictness::Quick).unwrap());
}

#[test]
fn unknown_backend_is_a_configuration_error() {
    let mut mb = MbString::default();
    mb.set_backend("iconv");

    let err = mb.strlen("abc").unwrap_err();
    assert_eq!(err, MbError::UnknownBackend("iconv".to_string()));
    assert!(err.to_string().contains("Configuration error"));
    assert!(mb.substr("abc", 0, None).is_err());
}

#[test]
fn backend_is_resolved_at_call_time() {
    let mut mb = MbString::default();
    assert_eq!(mb.strlen("é").unwrap(), 1);
    mb.set_backend("bytes");
    assert_eq!(mb.strlen("é").unwrap(), 2);
}

struct WordBackend;

impl Backend for WordBackend {
    fn name(&self) -> &'static str {
        "words"
    }

    fn units(&self, input: &[u8]) -> Vec<Range<usize>> {
        let mut units = Vec::new();
        let mut start = 0;
        for (i, b) in input.iter().enumerate() {
            if *b == b' ' {
                units.push(start..i + 1);
                start = i + 1;
            }
        }
        if start < input.len() {
            units.push(start..input.len());
        }
        units
    }
}

#[test]
fn custom_backends_can_be_registered() {
    let mut registry = Registry::with_builtin();
    registry.register(Arc::new(WordBackend));
    assert_eq!(registry.names(), vec!["bytes", "native", "words"]);

    let mb = MbString::new(registry, "words");
    assert_eq!(mb.strlen("pay for order").unwrap(), 3);
    assert_eq!(mb.substr("pay for order", 1, Some(1)).unwrap(), b"for ");
}

#[test]
fn config_defaults_to_native() {
    let config: MbConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(config.backend, "native");

    let config: MbConfig = serde_json::from_str(r#"{"backend":"bytes"}"#).unwrap();
    assert_eq!(MbString::from_config(&config).strlen("é").unwrap(), 2);
}
