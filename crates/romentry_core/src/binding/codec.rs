//! Per-type conversion between control values and record values.
//!
//! # Responsibility
//! - Decode what a control reports into a record `Value`.
//! - Encode a record `Value` into what a control accepts.
//! - Report per-control units and default native states.
//!
//! # Invariants
//! - A numeric/angle control at its minimum decodes to `Value::NoValue`, and
//!   `Value::NoValue` encodes to that minimum.
//! - Check boxes only have two legal states; a partial state is a wiring bug.
//! - Choice encoding never falls back to a different option.
//! - Text is trimmed on decode and written verbatim on encode.

use crate::binding::registry::ControlBinding;
use crate::model::control::{CheckState, ControlType, NativeValue};
use crate::model::value::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type CodecResult<T> = Result<T, CodecError>;

/// Programming errors in control wiring detected by the codec.
#[derive(Debug, Clone, PartialEq)]
pub enum CodecError {
    /// Value is not one of the choice control's options.
    InvalidChoiceValue { control: String, value: String },
    /// Control reported or was given something its type can never hold.
    InvariantViolation { control: String, detail: String },
}

impl Display for CodecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidChoiceValue { control, value } => {
                write!(f, "invalid choice value `{value}` for control `{control}`")
            }
            Self::InvariantViolation { control, detail } => {
                write!(f, "invariant violation on control `{control}`: {detail}")
            }
        }
    }
}

impl Error for CodecError {}

/// Display texts stored for check box states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckTexts {
    pub yes_text: String,
    pub no_text: String,
}

/// Conversion strategy for one control type.
pub trait ValueCodec: Sync {
    fn decode(
        &self,
        control: &ControlBinding,
        native: &NativeValue,
        texts: &CheckTexts,
    ) -> CodecResult<Value>;

    fn encode(
        &self,
        control: &ControlBinding,
        value: &Value,
        texts: &CheckTexts,
    ) -> CodecResult<NativeValue>;
}

struct NumericCodec;
struct TextCodec;
struct ChoiceCodec;
struct BooleanCodec;

static NUMERIC_CODEC: NumericCodec = NumericCodec;
static TEXT_CODEC: TextCodec = TextCodec;
static CHOICE_CODEC: ChoiceCodec = ChoiceCodec;
static BOOLEAN_CODEC: BooleanCodec = BooleanCodec;

/// Returns the codec for a control type.
///
/// Angle controls share the numeric sentinel convention.
pub fn codec_for(control_type: ControlType) -> &'static dyn ValueCodec {
    match control_type {
        ControlType::Numeric | ControlType::CompoundAngle => &NUMERIC_CODEC,
        ControlType::Text | ControlType::MultilineText => &TEXT_CODEC,
        ControlType::Choice => &CHOICE_CODEC,
        ControlType::Boolean => &BOOLEAN_CODEC,
    }
}

pub fn decode(
    control: &ControlBinding,
    native: &NativeValue,
    texts: &CheckTexts,
) -> CodecResult<Value> {
    codec_for(control.control_type).decode(control, native, texts)
}

pub fn encode(
    control: &ControlBinding,
    value: &Value,
    texts: &CheckTexts,
) -> CodecResult<NativeValue> {
    codec_for(control.control_type).encode(control, value, texts)
}

/// Record value the control reports after being shown `value`.
///
/// `no_value_text` aimed at a numeric or angle control reads as `NoValue`,
/// which is how not-measured values come back from text-typed stores. A
/// number at the control minimum also collapses to `NoValue`.
pub fn admit(
    control: &ControlBinding,
    value: &Value,
    texts: &CheckTexts,
    no_value_text: &str,
) -> CodecResult<Value> {
    let native = match value {
        Value::Text(text) if control.control_type.has_unit() && text == no_value_text => {
            encode(control, &Value::NoValue, texts)?
        }
        other => encode(control, other, texts)?,
    };
    decode(control, &native, texts)
}

/// Unit suffix for the control's current value.
///
/// Numeric and angle controls report their suffix only while they hold a
/// number; every other case reports `""`.
pub fn unit<'a>(control: &'a ControlBinding, value: &Value) -> &'a str {
    if control.control_type.has_unit() && matches!(value, Value::Number(_)) {
        control.props.suffix.as_str()
    } else {
        ""
    }
}

/// Native state of a freshly constructed control.
pub fn default_native(control: &ControlBinding) -> NativeValue {
    match control.control_type {
        ControlType::Numeric | ControlType::CompoundAngle => {
            NativeValue::Number(control.props.minimum)
        }
        ControlType::Text | ControlType::MultilineText => NativeValue::Text(String::new()),
        ControlType::Choice => NativeValue::Text(
            control.props.options.first().cloned().unwrap_or_default(),
        ),
        ControlType::Boolean => NativeValue::Check(CheckState::Unchecked),
    }
}

fn violation(control: &ControlBinding, detail: impl Into<String>) -> CodecError {
    CodecError::InvariantViolation {
        control: control.id.clone(),
        detail: detail.into(),
    }
}

impl ValueCodec for NumericCodec {
    fn decode(
        &self,
        control: &ControlBinding,
        native: &NativeValue,
        _texts: &CheckTexts,
    ) -> CodecResult<Value> {
        match native {
            NativeValue::Number(value) if *value == control.props.minimum => Ok(Value::NoValue),
            NativeValue::Number(value) => Ok(Value::Number(*value)),
            other => Err(violation(control, format!("numeric control reported {other:?}"))),
        }
    }

    fn encode(
        &self,
        control: &ControlBinding,
        value: &Value,
        _texts: &CheckTexts,
    ) -> CodecResult<NativeValue> {
        match value {
            Value::NoValue => Ok(NativeValue::Number(control.props.minimum)),
            Value::Number(value) => Ok(NativeValue::Number(*value)),
            Value::Text(_) => Err(violation(control, "text value for numeric control")),
        }
    }
}

impl ValueCodec for TextCodec {
    fn decode(
        &self,
        control: &ControlBinding,
        native: &NativeValue,
        _texts: &CheckTexts,
    ) -> CodecResult<Value> {
        match native {
            NativeValue::Text(text) => Ok(Value::Text(text.trim().to_string())),
            other => Err(violation(control, format!("text control reported {other:?}"))),
        }
    }

    fn encode(
        &self,
        control: &ControlBinding,
        value: &Value,
        _texts: &CheckTexts,
    ) -> CodecResult<NativeValue> {
        match value {
            Value::Text(text) => Ok(NativeValue::Text(text.clone())),
            other => Err(violation(control, format!("{other:?} for text control"))),
        }
    }
}

impl ValueCodec for ChoiceCodec {
    fn decode(
        &self,
        control: &ControlBinding,
        native: &NativeValue,
        _texts: &CheckTexts,
    ) -> CodecResult<Value> {
        match native {
            NativeValue::Text(text) => Ok(Value::Text(text.clone())),
            other => Err(violation(control, format!("choice control reported {other:?}"))),
        }
    }

    fn encode(
        &self,
        control: &ControlBinding,
        value: &Value,
        _texts: &CheckTexts,
    ) -> CodecResult<NativeValue> {
        let Value::Text(text) = value else {
            return Err(violation(control, format!("{value:?} for choice control")));
        };
        if control.props.options.iter().any(|option| option == text) {
            Ok(NativeValue::Text(text.clone()))
        } else {
            Err(CodecError::InvalidChoiceValue {
                control: control.id.clone(),
                value: text.clone(),
            })
        }
    }
}

impl ValueCodec for BooleanCodec {
    fn decode(
        &self,
        control: &ControlBinding,
        native: &NativeValue,
        texts: &CheckTexts,
    ) -> CodecResult<Value> {
        match native {
            NativeValue::Check(CheckState::Checked) => Ok(Value::Text(texts.yes_text.clone())),
            NativeValue::Check(CheckState::Unchecked) => Ok(Value::Text(texts.no_text.clone())),
            NativeValue::Check(CheckState::PartiallyChecked) => {
                Err(violation(control, "unexpected partially checked state"))
            }
            other => Err(violation(control, format!("check box reported {other:?}"))),
        }
    }

    fn encode(
        &self,
        control: &ControlBinding,
        value: &Value,
        texts: &CheckTexts,
    ) -> CodecResult<NativeValue> {
        match value {
            Value::Text(text) if *text == texts.yes_text => {
                Ok(NativeValue::Check(CheckState::Checked))
            }
            Value::Text(text) if *text == texts.no_text => {
                Ok(NativeValue::Check(CheckState::Unchecked))
            }
            other => Err(violation(
                control,
                format!("unexpected check box entry value {other:?}"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{admit, decode, default_native, encode, unit, CheckTexts, CodecError};
    use crate::binding::registry::ControlBinding;
    use crate::model::control::{CheckState, ControlProps, ControlType, NativeValue};
    use crate::model::value::Value;

    fn texts() -> CheckTexts {
        CheckTexts {
            yes_text: "Kyllä".to_string(),
            no_text: "Ei".to_string(),
        }
    }

    fn binding(id: &str, control_type: ControlType, props: ControlProps) -> ControlBinding {
        ControlBinding {
            id: id.to_string(),
            control_type,
            props,
            variable_name: id[2..].to_string(),
            derived_from: None,
        }
    }

    #[test]
    fn numeric_minimum_is_no_value_both_ways() {
        let control = binding("spPaino", ControlType::Numeric, ControlProps::numeric(-1.0, " kg"));

        let decoded = decode(&control, &NativeValue::Number(-1.0), &texts()).unwrap();
        assert_eq!(decoded, Value::NoValue);
        let encoded = encode(&control, &Value::NoValue, &texts()).unwrap();
        assert_eq!(encoded, NativeValue::Number(-1.0));
        assert_eq!(decode(&control, &encoded, &texts()).unwrap(), Value::NoValue);

        let real = encode(&control, &Value::Number(72.5), &texts()).unwrap();
        assert_eq!(decode(&control, &real, &texts()).unwrap(), Value::Number(72.5));
    }

    #[test]
    fn numeric_zero_is_a_value_when_minimum_is_lower() {
        let control = binding("spX", ControlType::Numeric, ControlProps::numeric(-1.0, ""));
        assert_eq!(
            decode(&control, &NativeValue::Number(0.0), &texts()).unwrap(),
            Value::Number(0.0)
        );
    }

    #[test]
    fn partial_check_state_is_an_invariant_violation() {
        let control = binding("xbKipu", ControlType::Boolean, ControlProps::default());
        let err = decode(
            &control,
            &NativeValue::Check(CheckState::PartiallyChecked),
            &texts(),
        )
        .unwrap_err();
        assert!(matches!(err, CodecError::InvariantViolation { .. }));

        assert_eq!(
            decode(&control, &NativeValue::Check(CheckState::Checked), &texts()).unwrap(),
            Value::text("Kyllä")
        );
        assert_eq!(
            encode(&control, &Value::text("Ei"), &texts()).unwrap(),
            NativeValue::Check(CheckState::Unchecked)
        );
    }

    #[test]
    fn unknown_choice_is_rejected() {
        let control = binding(
            "cbApuvaline",
            ControlType::Choice,
            ControlProps::choice(["Ei", "Kepit", "Rollaattori"]),
        );
        assert_eq!(
            encode(&control, &Value::text("Kepit"), &texts()).unwrap(),
            NativeValue::text("Kepit")
        );
        let err = encode(&control, &Value::text("Pyörätuoli"), &texts()).unwrap_err();
        assert_eq!(
            err,
            CodecError::InvalidChoiceValue {
                control: "cbApuvaline".to_string(),
                value: "Pyörätuoli".to_string(),
            }
        );
        assert_eq!(default_native(&control), NativeValue::text("Ei"));
    }

    #[test]
    fn text_is_trimmed_on_decode_only() {
        let control = binding("lnNimi", ControlType::Text, ControlProps::default());
        assert_eq!(
            decode(&control, &NativeValue::text("  Matti  "), &texts()).unwrap(),
            Value::text("Matti")
        );
        assert_eq!(
            encode(&control, &Value::text(" x "), &texts()).unwrap(),
            NativeValue::text(" x ")
        );
    }

    #[test]
    fn admitted_values_match_what_the_control_shows() {
        let weight = binding("spPaino", ControlType::Numeric, ControlProps::numeric(-1.0, " kg"));
        let name = binding("lnNimi", ControlType::Text, ControlProps::default());

        assert_eq!(
            admit(&weight, &Value::Number(-1.0), &texts(), "Ei mitattu").unwrap(),
            Value::NoValue
        );
        assert_eq!(
            admit(&weight, &Value::text("Ei mitattu"), &texts(), "Ei mitattu").unwrap(),
            Value::NoValue
        );
        assert_eq!(
            admit(&weight, &Value::Number(80.0), &texts(), "Ei mitattu").unwrap(),
            Value::Number(80.0)
        );
        assert!(admit(&weight, &Value::text("kevyt"), &texts(), "Ei mitattu").is_err());

        assert_eq!(
            admit(&name, &Value::text("Ei mitattu"), &texts(), "Ei mitattu").unwrap(),
            Value::text("Ei mitattu")
        );
        assert!(admit(&name, &Value::NoValue, &texts(), "Ei mitattu").is_err());
    }

    #[test]
    fn unit_is_empty_for_no_value() {
        let control = binding("csbFleksio", ControlType::CompoundAngle, ControlProps::numeric(-181.0, "°"));
        assert_eq!(unit(&control, &Value::Number(90.0)), "°");
        assert_eq!(unit(&control, &Value::NoValue), "");
    }
}
