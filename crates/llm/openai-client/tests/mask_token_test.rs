//! Tests for [`openai_client::mask_token`], which keeps API keys out of summarizer logs.

use openai_client::mask_token;

#[test]
fn keys_up_to_eleven_bytes_are_fully_hidden() {
    for key in ["", "k", "sk-short", "sk-proj-123"] {
        assert_eq!(mask_token(key), "***", "key {key:?} leaked");
    }
}

#[test]
fn long_keys_keep_seven_byte_head_and_four_byte_tail() {
    assert_eq!(mask_token("sk-proj-coachmemory"), "sk-proj***mory");
    assert_eq!(mask_token("sk-live-abcd"), "sk-live***abcd");
}

#[test]
fn masked_key_never_contains_the_middle() {
    let key = "sk-proj-SECRETSECRETSECRET-tail";
    let masked = mask_token(key);
    assert!(!masked.contains("SECRET"));
    assert_eq!(masked.len(), 7 + 3 + 4);
}

/// Keys with multi-byte characters at the cut points must not panic.
#[test]
fn non_ascii_cut_points_fall_back_to_full_mask() {
    assert_eq!(mask_token("sk-proø-0123456789"), "***");
}
