//! Unit tests for the context module.
//!
//! | Component             | File                    | Covered API / behaviour |
//! |-----------------------|-------------------------|-------------------------|
//! | `estimate_tokens`     | estimate_tokens_test.rs | Token estimation |
//! | `ConversationContext` | context_test.rs         | empty, is_empty, estimated_tokens, format_for_model, to_messages |
//! | `ContextAssembler`    | assembler_test.rs       | packet selection and ordering, rolling-summary fallback, purity |
