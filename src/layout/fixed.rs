//! Fixed-layout interpreter (§4.5): a small token-stream language that
//! overrides the automatic breaker with an explicit system/page plan —
//! `barcount n` assigns the next system exactly `n` bars, `repeatcount n`
//! says how many times to play it back, `repeatptr offset` jumps the
//! instruction pointer (for a layout that loops over a repeated section),
//! and `newpage` forces a page break. Jumps are bounded in depth so a
//! malformed `repeatptr` loop can't run forever.

use crate::domain::errors::EngraveError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixedToken {
    BarCount(u32),
    RepeatCount(u16),
    RepeatPtr(i32),
    NewPage,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FixedSystem {
    pub bar_count: u32,
    pub repeat_count: u16,
    pub starts_new_page: bool,
}

/// Maximum number of `repeatptr` jumps the interpreter will follow before
/// concluding the token stream loops forever.
pub const MAX_JUMP_STEPS: u32 = 10_000;

pub fn parse_tokens(source: &str) -> Result<Vec<FixedToken>, EngraveError> {
    let mut tokens = Vec::new();
    let mut words = source.split_whitespace().peekable();
    while let Some(word) = words.next() {
        match word {
            "barcount" => {
                let n = next_int(&mut words, "barcount")?;
                tokens.push(FixedToken::BarCount(n as u32));
            }
            "repeatcount" => {
                let n = next_int(&mut words, "repeatcount")?;
                tokens.push(FixedToken::RepeatCount(n as u16));
            }
            "repeatptr" => {
                let n = next_int(&mut words, "repeatptr")?;
                tokens.push(FixedToken::RepeatPtr(n));
            }
            "newpage" => tokens.push(FixedToken::NewPage),
            other => {
                return Err(EngraveError::Message(format!(
                    "unknown fixed-layout directive '{other}'"
                )))
            }
        }
    }
    Ok(tokens)
}

fn next_int<'a, I: Iterator<Item = &'a str>>(words: &mut I, directive: &str) -> Result<i32, EngraveError> {
    words
        .next()
        .ok_or_else(|| EngraveError::Message(format!("'{directive}' is missing its argument")))?
        .parse()
        .map_err(|_| EngraveError::Message(format!("'{directive}' argument is not an integer")))
}

/// Execute a parsed fixed-layout token stream, producing the system plan.
/// `repeatptr n` jumps the instruction pointer by `n` tokens (negative
/// jumps backward, positive forward) relative to the position right after
/// the `repeatptr` token itself.
pub fn execute(tokens: &[FixedToken]) -> Result<Vec<FixedSystem>, EngraveError> {
    let mut systems = Vec::new();
    let mut pc: i64 = 0;
    let mut steps = 0u32;
    let mut pending_new_page = false;

    let mut current = FixedSystem {
        bar_count: 0,
        repeat_count: 1,
        starts_new_page: false,
    };
    let mut have_bar_count = false;

    while (pc as usize) < tokens.len() {
        steps += 1;
        if steps > MAX_JUMP_STEPS {
            return Err(EngraveError::NestingTooDeep { limit: MAX_JUMP_STEPS });
        }
        match tokens[pc as usize] {
            FixedToken::BarCount(n) => {
                if have_bar_count {
                    current.starts_new_page = pending_new_page;
                    systems.push(current.clone());
                    pending_new_page = false;
                    current = FixedSystem {
                        bar_count: 0,
                        repeat_count: 1,
                        starts_new_page: false,
                    };
                }
                current.bar_count = n;
                have_bar_count = true;
            }
            FixedToken::RepeatCount(n) => {
                current.repeat_count = n;
            }
            FixedToken::NewPage => {
                pending_new_page = true;
            }
            FixedToken::RepeatPtr(offset) => {
                pc += offset as i64;
                continue;
            }
        }
        pc += 1;
    }

    if have_bar_count {
        current.starts_new_page = pending_new_page;
        systems.push(current);
    }

    Ok(systems)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_simple_fixed_layout_program() {
        let tokens = parse_tokens("barcount 4 repeatcount 2 newpage barcount 3").unwrap();
        assert_eq!(
            tokens,
            vec![
                FixedToken::BarCount(4),
                FixedToken::RepeatCount(2),
                FixedToken::NewPage,
                FixedToken::BarCount(3),
            ]
        );
    }

    #[test]
    fn executes_into_a_system_plan_with_repeat_counts_and_page_breaks() {
        let tokens = parse_tokens("barcount 4 repeatcount 2 newpage barcount 3").unwrap();
        let systems = execute(&tokens).unwrap();
        assert_eq!(systems.len(), 2);
        assert_eq!(systems[0].bar_count, 4);
        assert_eq!(systems[0].repeat_count, 2);
        assert!(!systems[0].starts_new_page);
        assert_eq!(systems[1].bar_count, 3);
        assert!(systems[1].starts_new_page);
    }

    #[test]
    fn repeatptr_jump_is_followed() {
        // barcount 2, then jump forward past a barcount 99 we never reach.
        let tokens = vec![
            FixedToken::BarCount(2),
            FixedToken::RepeatPtr(2),
            FixedToken::BarCount(99),
            FixedToken::BarCount(5),
        ];
        let systems = execute(&tokens).unwrap();
        assert_eq!(systems.len(), 2);
        assert_eq!(systems[0].bar_count, 2);
        assert_eq!(systems[1].bar_count, 5);
    }

    #[test]
    fn unbounded_backward_jump_is_rejected() {
        let tokens = vec![FixedToken::BarCount(1), FixedToken::RepeatPtr(-1)];
        let result = execute(&tokens);
        assert!(result.is_err());
    }
}
