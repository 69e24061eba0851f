//! Typed parameter parsing for effect steps.
//!
//! Chain steps carry loose `name -> value` maps. Each effect turns its map
//! into a typed config through a [`ParamReader`], which accepts numbers or
//! numeric strings, resolves aliases, and rejects keys the effect does not
//! declare.

use serde::Serialize;
use serde_json::Value;

use crate::error::EffectError;

/// Raw parameter map as supplied in a chain step.
pub type ParamMap = serde_json::Map<String, Value>;

/// Default value of a declared parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "value")]
pub enum ParamDefault {
    /// Used when the key is absent.
    Number(f64),
    /// Must be supplied.
    Required,
    /// May be omitted; there is no fallback value.
    Optional,
}

/// Declaration of one parameter an effect accepts.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub default: ParamDefault,
    pub description: &'static str,
}

/// Reads typed values out of a [`ParamMap`] for one effect.
pub struct ParamReader<'a> {
    effect: &'static str,
    params: &'a ParamMap,
    consumed: Vec<&'a str>,
}

impl<'a> ParamReader<'a> {
    pub fn new(effect: &'static str, params: &'a ParamMap) -> Self {
        ParamReader {
            effect,
            params,
            consumed: Vec::with_capacity(params.len()),
        }
    }

    pub fn effect(&self) -> &'static str {
        self.effect
    }

    /// Build an `InvalidParameter` error for this effect.
    pub fn invalid(&self, key: &str, reason: impl Into<String>) -> EffectError {
        EffectError::invalid(self.effect, key, reason)
    }

    /// Find the value under the spec's name or one of its aliases.
    /// `null` counts as absent.
    fn lookup(&mut self, spec: &ParamSpec) -> Result<Option<&'a Value>, EffectError> {
        let mut found: Option<(&'a str, &'a Value)> = None;
        let names = std::iter::once(&spec.name).chain(spec.aliases.iter());
        for name in names {
            if let Some((key, value)) = self.params.get_key_value(*name) {
                if let Some((first, _)) = found {
                    return Err(self.invalid(
                        key,
                        format!("given together with '{first}', which names the same parameter"),
                    ));
                }
                self.consumed.push(key.as_str());
                found = Some((key.as_str(), value));
            }
        }
        Ok(found.map(|(_, v)| v).filter(|v| !v.is_null()))
    }

    fn number(&self, key: &str, value: &Value) -> Result<f64, EffectError> {
        let n = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        match n {
            Some(n) if n.is_finite() => Ok(n),
            Some(_) => Err(self.invalid(key, "must be finite")),
            None => Err(self.invalid(key, format!("expected a number, got {value}"))),
        }
    }

    fn integer(&self, key: &str, value: &Value) -> Result<u64, EffectError> {
        if let Some(n) = value.as_u64() {
            return Ok(n);
        }
        let n = self.number(key, value)?;
        if n < 0.0 || n.fract() != 0.0 || n > u64::MAX as f64 {
            return Err(self.invalid(key, format!("expected a non-negative integer, got {value}")));
        }
        Ok(n as u64)
    }

    /// Read a float, falling back to the spec's numeric default.
    pub fn f64(&mut self, spec: &ParamSpec) -> Result<f64, EffectError> {
        match self.lookup(spec)? {
            Some(v) => self.number(spec.name, v),
            None => match spec.default {
                ParamDefault::Number(d) => Ok(d),
                _ => Err(self.invalid(spec.name, "missing required parameter")),
            },
        }
    }

    /// Read a non-negative integer, falling back to the spec's numeric default.
    pub fn u64(&mut self, spec: &ParamSpec) -> Result<u64, EffectError> {
        match self.lookup(spec)? {
            Some(v) => self.integer(spec.name, v),
            None => match spec.default {
                ParamDefault::Number(d) => Ok(d as u64),
                _ => Err(self.invalid(spec.name, "missing required parameter")),
            },
        }
    }

    /// Read an integer that may be absent.
    pub fn optional_u64(&mut self, spec: &ParamSpec) -> Result<Option<u64>, EffectError> {
        match self.lookup(spec)? {
            Some(v) => self.integer(spec.name, v).map(Some),
            None => Ok(None),
        }
    }

    /// Reject any key that no read consumed.
    pub fn finish(self) -> Result<(), EffectError> {
        let unknown = self
            .params
            .keys()
            .find(|k| !self.consumed.contains(&k.as_str()));
        match unknown {
            Some(key) => Err(self.invalid(key, "unrecognized parameter")),
            None => Ok(()),
        }
    }
}

/// Check `lo <= value <= hi`.
pub fn ensure_range(effect: &str, key: &str, value: f64, lo: f64, hi: f64) -> Result<(), EffectError> {
    if value < lo || value > hi {
        return Err(EffectError::invalid(
            effect,
            key,
            format!("must be between {lo} and {hi}, got {value}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const GAIN: ParamSpec = ParamSpec {
        name: "gain",
        aliases: &["level"],
        default: ParamDefault::Number(0.5),
        description: "",
    };
    const COUNT: ParamSpec = ParamSpec {
        name: "count",
        aliases: &[],
        default: ParamDefault::Required,
        description: "",
    };
    const SEED: ParamSpec = ParamSpec {
        name: "seed",
        aliases: &[],
        default: ParamDefault::Optional,
        description: "",
    };

    fn map(v: Value) -> ParamMap {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn defaults_apply_when_absent() {
        let params = map(json!({ "count": 3 }));
        let mut r = ParamReader::new("test", &params);
        assert_eq!(r.f64(&GAIN).unwrap(), 0.5);
        assert_eq!(r.u64(&COUNT).unwrap(), 3);
        assert_eq!(r.optional_u64(&SEED).unwrap(), None);
        r.finish().unwrap();
    }

    #[test]
    fn aliases_and_numeric_strings_are_accepted() {
        let params = map(json!({ "level": "0.25", "count": 4.0, "seed": null }));
        let mut r = ParamReader::new("test", &params);
        assert_eq!(r.f64(&GAIN).unwrap(), 0.25);
        assert_eq!(r.u64(&COUNT).unwrap(), 4);
        assert_eq!(r.optional_u64(&SEED).unwrap(), None);
        r.finish().unwrap();
    }

    #[test]
    fn unknown_key_is_rejected() {
        let params = map(json!({ "count": 1, "gian": 0.3 }));
        let mut r = ParamReader::new("test", &params);
        r.f64(&GAIN).unwrap();
        r.u64(&COUNT).unwrap();
        match r.finish() {
            Err(EffectError::InvalidParameter { effect, key, .. }) => {
                assert_eq!(effect, "test");
                assert_eq!(key, "gian");
            }
            other => panic!("expected InvalidParameter, got {other:?}"),
        }
    }

    #[test]
    fn missing_required_and_bad_types_fail() {
        let empty = ParamMap::new();
        let mut r = ParamReader::new("test", &empty);
        assert!(matches!(r.u64(&COUNT), Err(EffectError::InvalidParameter { .. })));

        let params = map(json!({ "gain": "loud", "count": 1.5 }));
        let mut r = ParamReader::new("test", &params);
        assert!(r.f64(&GAIN).is_err());
        assert!(r.u64(&COUNT).is_err());
    }

    #[test]
    fn name_and_alias_together_is_an_error() {
        let params = map(json!({ "gain": 0.1, "level": 0.2 }));
        let mut r = ParamReader::new("test", &params);
        assert!(r.f64(&GAIN).is_err());
    }

    #[test]
    fn range_check() {
        assert!(ensure_range("e", "k", 0.5, 0.0, 1.0).is_ok());
        assert!(ensure_range("e", "k", 1.5, 0.0, 1.0).is_err());
    }
}
