//! Callback signatures for bridging positional-argument callback APIs.
//!
//! A signature is a list of [`Token`]s, one per argument position of the
//! callback a foreign API will invoke. Parsing validates the combination up
//! front; [`Signature::dispatch`] then decides, for a concrete argument list,
//! whether the callback means "rejected with X" or "fulfilled with Y".
//!
//! ```
//! use remoter_types::{Signature, Token, Verdict};
//! use serde_json::{Value, json};
//!
//! let node_style = Signature::parse(&[Token::Error, Token::Result]).unwrap();
//! assert_eq!(
//!     node_style.dispatch(&[Value::Null, json!("ok")]),
//!     Verdict::Resolve(json!("ok"))
//! );
//! assert_eq!(
//!     node_style.dispatch(&[json!("boom"), json!("ok")]),
//!     Verdict::Reject(json!("boom"))
//! );
//! ```

use std::fmt;

use serde_json::Value;
use thiserror::Error;

/// Role of one argument position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token {
    /// A single error argument.
    Error,
    /// All remaining arguments are errors. Must be last.
    ErrorList,
    /// A single result argument.
    Result,
    /// All remaining arguments are results. Must be last.
    ResultList,
    /// Ignored position.
    Skip,
}

impl Token {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::ErrorList => "ERROR_LIST",
            Self::Result => "RESULT",
            Self::ResultList => "RESULT_LIST",
            Self::Skip => "_",
        }
    }

    fn is_list(self) -> bool {
        matches!(self, Self::ErrorList | Self::ResultList)
    }

    /// The other token of the same category (singular <-> list).
    fn counterpart(self) -> Option<Self> {
        match self {
            Self::Error => Some(Self::ErrorList),
            Self::ErrorList => Some(Self::Error),
            Self::Result => Some(Self::ResultList),
            Self::ResultList => Some(Self::Result),
            Self::Skip => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Invalid token combination. Raised when the callback is generated, never
/// when it is invoked.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("no argument token defined")]
    Empty,
    #[error("only one argument token of type {0} is allowed")]
    Duplicate(Token),
    #[error("argument token {token} is allowed only as the last argument (found at position {position})")]
    ListNotLast { token: Token, position: usize },
    #[error("argument tokens {0} and {1} cannot be combined")]
    Conflicting(Token, Token),
}

/// A value that can travel through a generated callback.
///
/// Truthiness decides whether an error position actually carries an error;
/// `absent` stands in for positions the caller did not pass; `from_list`
/// packs the tail for the list tokens.
pub trait Argument: Clone {
    fn is_truthy(&self) -> bool;

    fn absent() -> Self;

    #[must_use]
    fn from_list(items: Vec<Self>) -> Self;
}

/// JavaScript truthiness: `null`, `false`, `0` and `""` are falsy.
impl Argument for Value {
    fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(flag) => *flag,
            Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
            Value::String(text) => !text.is_empty(),
            Value::Array(_) | Value::Object(_) => true,
        }
    }

    fn absent() -> Self {
        Value::Null
    }

    fn from_list(items: Vec<Self>) -> Self {
        Value::Array(items)
    }
}

/// What a callback invocation means for the Deferred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict<V> {
    Resolve(V),
    Reject(V),
}

/// A validated signature: the position of every token that is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    error: Option<usize>,
    error_list: Option<usize>,
    result: Option<usize>,
    result_list: Option<usize>,
}

impl Signature {
    const EMPTY: Signature = Signature {
        error: None,
        error_list: None,
        result: None,
        result_list: None,
    };

    /// `callback(error, result)`.
    pub const ERROR_RESULT: Signature = Signature {
        error: Some(0),
        error_list: None,
        result: Some(1),
        result_list: None,
    };

    /// `callback(result, error)`.
    pub const RESULT_ERROR: Signature = Signature {
        error: Some(1),
        error_list: None,
        result: Some(0),
        result_list: None,
    };

    pub fn parse(tokens: &[Token]) -> Result<Self, SignatureError> {
        let mut signature = Self::EMPTY;
        let last = tokens.len().saturating_sub(1);

        for (position, &token) in tokens.iter().enumerate() {
            if token == Token::Skip {
                continue;
            }
            if token.is_list() && position != last {
                return Err(SignatureError::ListNotLast { token, position });
            }
            if signature.slot(token).is_some() {
                return Err(SignatureError::Duplicate(token));
            }
            if let Some(other) = token.counterpart()
                && signature.slot(other).is_some()
            {
                return Err(SignatureError::Conflicting(other, token));
            }
            *signature.slot_mut(token) = Some(position);
        }

        if signature == Self::EMPTY {
            return Err(SignatureError::Empty);
        }
        Ok(signature)
    }

    fn slot(&self, token: Token) -> Option<usize> {
        match token {
            Token::Error => self.error,
            Token::ErrorList => self.error_list,
            Token::Result => self.result,
            Token::ResultList => self.result_list,
            Token::Skip => None,
        }
    }

    fn slot_mut(&mut self, token: Token) -> &mut Option<usize> {
        match token {
            Token::Error | Token::Skip => &mut self.error,
            Token::ErrorList => &mut self.error_list,
            Token::Result => &mut self.result,
            Token::ResultList => &mut self.result_list,
        }
    }

    fn has_error(&self) -> bool {
        self.error.is_some() || self.error_list.is_some()
    }

    fn has_result(&self) -> bool {
        self.result.is_some() || self.result_list.is_some()
    }

    /// Both an error and a result token are present, so an error position
    /// only counts when it is truthy.
    #[must_use]
    pub fn is_compound(&self) -> bool {
        self.has_error() && self.has_result()
    }

    /// Interpret one invocation of the callback.
    #[must_use]
    pub fn dispatch<V: Argument>(&self, args: &[V]) -> Verdict<V> {
        let at = |index: usize| args.get(index).cloned().unwrap_or_else(V::absent);
        let tail = |index: usize| args.get(index..).map(<[V]>::to_vec).unwrap_or_default();
        let compound = self.is_compound();

        if let Some(index) = self.error {
            let error = at(index);
            if !compound || error.is_truthy() {
                return Verdict::Reject(error);
            }
        }
        if let Some(index) = self.error_list {
            let errors = tail(index);
            if !compound || errors.iter().any(Argument::is_truthy) {
                return Verdict::Reject(V::from_list(errors));
            }
        }
        match (self.result, self.result_list) {
            (Some(index), _) => Verdict::Resolve(at(index)),
            (None, Some(index)) => Verdict::Resolve(V::from_list(tail(index))),
            // Only reachable without any token, which `parse` refuses.
            (None, None) => Verdict::Reject(V::absent()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(tokens: &[Token]) -> Signature {
        Signature::parse(tokens).unwrap()
    }

    #[test]
    fn rejects_signature_without_tokens() {
        assert_eq!(Signature::parse(&[]), Err(SignatureError::Empty));
        assert_eq!(
            Signature::parse(&[Token::Skip, Token::Skip]),
            Err(SignatureError::Empty)
        );
    }

    #[test]
    fn rejects_duplicate_tokens() {
        assert_eq!(
            Signature::parse(&[Token::Error, Token::Error]),
            Err(SignatureError::Duplicate(Token::Error))
        );
        assert_eq!(
            Signature::parse(&[Token::Result, Token::Skip, Token::Result]),
            Err(SignatureError::Duplicate(Token::Result))
        );
    }

    #[test]
    fn rejects_list_token_before_the_end() {
        assert_eq!(
            Signature::parse(&[Token::ResultList, Token::Error]),
            Err(SignatureError::ListNotLast {
                token: Token::ResultList,
                position: 0
            })
        );
        assert_eq!(
            Signature::parse(&[Token::ErrorList, Token::ResultList]),
            Err(SignatureError::ListNotLast {
                token: Token::ErrorList,
                position: 0
            })
        );
    }

    #[test]
    fn rejects_singular_and_list_of_same_category() {
        assert_eq!(
            Signature::parse(&[Token::Error, Token::ErrorList]),
            Err(SignatureError::Conflicting(Token::Error, Token::ErrorList))
        );
        assert_eq!(
            Signature::parse(&[Token::Result, Token::ResultList]),
            Err(SignatureError::Conflicting(Token::Result, Token::ResultList))
        );
    }

    #[test]
    fn error_at_position_zero_counts() {
        let signature = parse(&[Token::Error]);
        assert_eq!(
            signature.dispatch(&[json!("boom")]),
            Verdict::Reject(json!("boom"))
        );
    }

    #[test]
    fn error_only_rejects_even_when_falsy() {
        let signature = parse(&[Token::Error]);
        assert_eq!(signature.dispatch(&[json!(0)]), Verdict::Reject(json!(0)));
        assert_eq!(
            signature.dispatch::<Value>(&[]),
            Verdict::Reject(Value::Null)
        );
    }

    #[test]
    fn result_only_resolves_even_when_falsy() {
        let signature = parse(&[Token::Result]);
        assert_eq!(
            signature.dispatch(&[json!(false)]),
            Verdict::Resolve(json!(false))
        );
    }

    #[test]
    fn compound_rejects_on_truthy_error() {
        let signature = parse(&[Token::Error, Token::Result]);
        assert_eq!(
            signature.dispatch(&[json!("boom"), json!("ok")]),
            Verdict::Reject(json!("boom"))
        );
    }

    #[test]
    fn compound_resolves_on_falsy_error() {
        let signature = parse(&[Token::Error, Token::Result]);
        assert_eq!(
            signature.dispatch(&[json!(""), json!("ok")]),
            Verdict::Resolve(json!("ok"))
        );
    }

    #[test]
    fn result_list_collects_the_tail() {
        let signature = parse(&[Token::Error, Token::ResultList]);
        assert_eq!(
            signature.dispatch(&[Value::Null, json!("x"), json!("y")]),
            Verdict::Resolve(json!(["x", "y"]))
        );
    }

    #[test]
    fn error_list_rejects_when_any_error_is_truthy() {
        let signature = parse(&[Token::Result, Token::ErrorList]);
        assert_eq!(
            signature.dispatch(&[json!("r"), Value::Null, json!("e2")]),
            Verdict::Reject(json!([null, "e2"]))
        );
        assert_eq!(
            signature.dispatch(&[json!("r"), Value::Null, json!(false)]),
            Verdict::Resolve(json!("r"))
        );
    }

    #[test]
    fn error_list_alone_rejects_with_empty_list() {
        let signature = parse(&[Token::ErrorList]);
        assert_eq!(
            signature.dispatch::<Value>(&[]),
            Verdict::Reject(json!([]))
        );
    }

    #[test]
    fn skipped_positions_are_ignored() {
        let signature = parse(&[Token::Skip, Token::Result, Token::Skip, Token::ErrorList]);
        assert_eq!(
            signature.dispatch(&[json!(true), json!("r"), json!(false), json!("e1"), json!("e2")]),
            Verdict::Reject(json!(["e1", "e2"]))
        );
    }

    #[test]
    fn missing_arguments_read_as_null() {
        let signature = parse(&[Token::Error, Token::Result]);
        assert_eq!(signature.dispatch::<Value>(&[]), Verdict::Resolve(Value::Null));
    }

    #[test]
    fn tokenless_signature_rejects_instead_of_panicking() {
        assert_eq!(
            Signature::EMPTY.dispatch(&[json!("r")]),
            Verdict::Reject(Value::Null)
        );
    }

    #[test]
    fn constants_match_parsed_signatures() {
        assert_eq!(parse(&[Token::Error, Token::Result]), Signature::ERROR_RESULT);
        assert_eq!(parse(&[Token::Result, Token::Error]), Signature::RESULT_ERROR);
    }

    #[test]
    fn truthiness_follows_javascript() {
        assert!(!Value::Null.is_truthy());
        assert!(!json!(0).is_truthy());
        assert!(!json!(0.0).is_truthy());
        assert!(!json!("").is_truthy());
        assert!(json!([]).is_truthy());
        assert!(json!({}).is_truthy());
        assert!(json!(-1).is_truthy());
    }
}
