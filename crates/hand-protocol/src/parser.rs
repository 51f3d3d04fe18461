//! Command line parser.
//!
//! Wire format: `<opcode>,<p1>,...,<pN>`, comma separated, no spaces
//! required (surrounding whitespace on any field is ignored).
//!
//! | Opcode     | Parameters                                        |
//! |------------|---------------------------------------------------|
//! | `command1` | index prox/med/dist/lat, middle prox/med/dist/lat |
//! | `command2` | ring prox/med/dist/lat, little prox/med/dist/lat  |
//! | `command3` | thumb prox, dist, lat                             |

use bionic_hand_pca9685::PulseValue;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::command::{Command, Opcode};
use crate::error::{ProtocolError, ProtocolResult};

/// How strictly parameters are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParsePolicy {
    /// Exact arity; every parameter must be a decimal integer in `0..=4095`.
    #[default]
    Strict,
    /// At least the required arity, extra fields ignored. Unparsable
    /// parameters read as 0 and values are masked to 12 bits.
    Lenient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParserConfig {
    pub policy: ParsePolicy,
    /// Accept `1`, `2`, `3` in place of `command1`..`command3`.
    pub accept_numeric_opcodes: bool,
}

/// Stateless line → [`Command`] parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandParser {
    config: ParserConfig,
}

impl CommandParser {
    pub fn new(config: ParserConfig) -> Self {
        Self { config }
    }

    pub fn strict() -> Self {
        Self::default()
    }

    pub fn lenient() -> Self {
        Self::new(ParserConfig {
            policy: ParsePolicy::Lenient,
            ..ParserConfig::default()
        })
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parses one line, without its terminator.
    ///
    /// # Errors
    ///
    /// Any [`ProtocolError`] means the whole line is to be discarded.
    pub fn parse(&self, line: &str) -> ProtocolResult<Command> {
        let line = line.trim();
        if line.is_empty() {
            return Err(ProtocolError::Empty);
        }

        let mut fields = line.split(',').map(str::trim);
        let token = fields.next().unwrap_or_default();
        let opcode = Opcode::from_token(token, self.config.accept_numeric_opcodes)
            .ok_or_else(|| ProtocolError::UnknownOpcode(token.to_string()))?;

        let params: Vec<&str> = fields.collect();
        let expected = opcode.arity();
        let arity_ok = match self.config.policy {
            ParsePolicy::Strict => params.len() == expected,
            ParsePolicy::Lenient => params.len() >= expected,
        };
        if !arity_ok {
            return Err(ProtocolError::WrongArity {
                opcode,
                expected,
                actual: params.len(),
            });
        }

        let pulses = params
            .iter()
            .take(expected)
            .enumerate()
            .map(|(i, token)| self.parse_pulse(i + 1, token))
            .collect::<ProtocolResult<Vec<_>>>()?;
        Command::new(opcode, pulses)
    }

    fn parse_pulse(&self, position: usize, token: &str) -> ProtocolResult<PulseValue> {
        match self.config.policy {
            ParsePolicy::Strict => {
                let value: i64 = token.parse().ok().ok_or_else(|| {
                    ProtocolError::InvalidParameter {
                        position,
                        token: token.to_string(),
                    }
                })?;
                u16::try_from(value)
                    .ok()
                    .and_then(PulseValue::new)
                    .ok_or(ProtocolError::PulseOutOfRange { position, value })
            }
            ParsePolicy::Lenient => {
                let value = token.parse::<i64>().unwrap_or_else(|_| {
                    debug!(position, token, "unparsable parameter read as 0");
                    0
                });
                let masked = value & i64::from(PulseValue::MAX);
                Ok(u16::try_from(masked)
                    .ok()
                    .and_then(PulseValue::new)
                    .unwrap_or_default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticks(cmd: &Command) -> Vec<u16> {
        cmd.pulses().iter().map(|p| p.ticks()).collect()
    }

    #[test]
    fn test_parse_thumb() -> ProtocolResult<()> {
        let cmd = CommandParser::strict().parse("command3,250,300,310")?;
        assert_eq!(cmd.opcode(), Opcode::Thumb);
        assert_eq!(ticks(&cmd), vec![250, 300, 310]);
        Ok(())
    }

    #[test]
    fn test_parse_tolerates_whitespace() -> ProtocolResult<()> {
        let cmd = CommandParser::strict().parse(" command3 , 250,300 ,310\r")?;
        assert_eq!(ticks(&cmd), vec![250, 300, 310]);
        Ok(())
    }

    #[test]
    fn test_empty_and_unknown() {
        let parser = CommandParser::strict();
        assert_eq!(parser.parse(""), Err(ProtocolError::Empty));
        assert_eq!(parser.parse("   "), Err(ProtocolError::Empty));
        assert_eq!(
            parser.parse("command4,1,2,3"),
            Err(ProtocolError::UnknownOpcode("command4".into()))
        );
        assert_eq!(
            parser.parse("3,250,300,310"),
            Err(ProtocolError::UnknownOpcode("3".into()))
        );
    }

    #[test]
    fn test_numeric_aliases() -> ProtocolResult<()> {
        let parser = CommandParser::new(ParserConfig {
            accept_numeric_opcodes: true,
            ..ParserConfig::default()
        });
        assert_eq!(parser.parse("3,250,300,310")?.opcode(), Opcode::Thumb);
        assert_eq!(
            parser.parse("1,1,2,3,4,5,6,7,8")?.opcode(),
            Opcode::FirstFingerPair
        );
        Ok(())
    }

    #[test]
    fn test_strict_rejects_short_and_long_lines() {
        let parser = CommandParser::strict();
        assert_eq!(
            parser.parse("command1,1,2,3"),
            Err(ProtocolError::WrongArity {
                opcode: Opcode::FirstFingerPair,
                expected: 8,
                actual: 3
            })
        );
        assert!(matches!(
            parser.parse("command3,1,2,3,4"),
            Err(ProtocolError::WrongArity { actual: 4, .. })
        ));
        // A trailing comma is an empty fourth field.
        assert!(matches!(
            parser.parse("command3,1,2,3,"),
            Err(ProtocolError::WrongArity { actual: 4, .. })
        ));
    }

    #[test]
    fn test_strict_rejects_bad_values() {
        let parser = CommandParser::strict();
        assert_eq!(
            parser.parse("command3,250,abc,310"),
            Err(ProtocolError::InvalidParameter {
                position: 2,
                token: "abc".into()
            })
        );
        assert_eq!(
            parser.parse("command3,250,300,4096"),
            Err(ProtocolError::PulseOutOfRange {
                position: 3,
                value: 4096
            })
        );
        assert_eq!(
            parser.parse("command3,-1,300,310"),
            Err(ProtocolError::PulseOutOfRange {
                position: 1,
                value: -1
            })
        );
    }

    #[test]
    fn test_lenient_reads_bad_tokens_as_zero() -> ProtocolResult<()> {
        let cmd = CommandParser::lenient().parse("command3,250,abc,")?;
        assert_eq!(ticks(&cmd), vec![250, 0, 0]);
        Ok(())
    }

    #[test]
    fn test_lenient_masks_and_ignores_extras() -> ProtocolResult<()> {
        let cmd = CommandParser::lenient().parse("command3,4096,4395,310,999,junk")?;
        assert_eq!(ticks(&cmd), vec![0, 299, 310]);
        Ok(())
    }

    #[test]
    fn test_lenient_still_rejects_short_lines() {
        assert!(matches!(
            CommandParser::lenient().parse("command1,1,2,3"),
            Err(ProtocolError::WrongArity { .. })
        ));
        assert!(matches!(
            CommandParser::lenient().parse("hello"),
            Err(ProtocolError::UnknownOpcode(_))
        ));
    }

    #[test]
    fn test_policy_serde() -> Result<(), serde_json::Error> {
        assert_eq!(serde_json::to_string(&ParsePolicy::Lenient)?, "\"lenient\"");
        let policy: ParsePolicy = serde_json::from_str("\"strict\"")?;
        assert_eq!(policy, ParsePolicy::Strict);
        Ok(())
    }
}
