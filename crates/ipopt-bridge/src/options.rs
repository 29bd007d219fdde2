//! Assembly of solver option text.
//!
//! Option lines are written in the solver's own option-file syntax
//! (`<name> <value>`) and forwarded verbatim. A key may appear more than once;
//! the last occurrence wins.

use std::path::Path;

use tracing::debug;

use crate::error::{BridgeError, BridgeResult};
use crate::runner::Application;

/// Settings applied after user configuration, whatever the user asked for.
///
/// The banner is suppressed, and the Hessian is always approximated because
/// the bridge has no exact-Hessian callback.
pub const FORCED_OVERRIDES: [(&str, &str); 2] = [
    ("sb", "yes"),
    ("hessian_approximation", "limited-memory"),
];

/// Concatenate option lines in order, each terminated by a line break.
pub fn build<S: AsRef<str>>(lines: &[S]) -> String {
    let mut text = String::new();
    for line in lines {
        text.push_str(line.as_ref());
        text.push('\n');
    }
    text
}

/// Force [`FORCED_OVERRIDES`] on an application that has already been
/// initialized from user option text.
pub fn apply_forced_overrides<A: Application + ?Sized>(app: &mut A) -> BridgeResult<()> {
    for (key, value) in FORCED_OVERRIDES {
        debug!(key, value, "forcing solver option");
        app.set_string_option(key, value)?;
    }
    Ok(())
}

/// Split option text into `(name, value)` pairs, in order.
///
/// Follows IPOPT's option-file tokenizer: tokens are separated by whitespace, a
/// `#` at the start of a token begins a comment that runs to the end of the
/// line, and a double quote toggles quoting so `"my out.txt"` is one token.
/// Quote characters are not part of the token.
pub fn parse_pairs(text: &str) -> BridgeResult<Vec<(String, String)>> {
    let tokens = tokenize(text)?;
    let mut tokens = tokens.into_iter();

    let mut pairs = Vec::new();
    while let Some(name) = tokens.next() {
        let value = tokens
            .next()
            .ok_or_else(|| BridgeError::Solver(format!("option {name} has no value")))?;
        pairs.push((name, value));
    }
    Ok(pairs)
}

fn tokenize(text: &str) -> BridgeResult<Vec<String>> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c == '#' {
            for c in chars.by_ref() {
                if c == '\n' {
                    break;
                }
            }
            continue;
        }

        let mut token = String::new();
        let mut quoted = false;
        while let Some(&c) = chars.peek() {
            if !quoted && c.is_whitespace() {
                break;
            }
            chars.next();
            if c == '"' {
                quoted = !quoted;
            } else {
                token.push(c);
            }
        }
        if quoted {
            return Err(BridgeError::Solver(format!(
                "unterminated quote in option token {token:?}"
            )));
        }
        tokens.push(token);
    }
    Ok(tokens)
}

/// How an option value is handed to the solver.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue<'a> {
    Int(i32),
    Num(f64),
    Str(&'a str),
}

/// IPOPT options registered as integers. Any other option whose value parses
/// as a number is passed as a number.
const INTEGER_OPTIONS: &[&str] = &[
    "accept_after_max_steps",
    "acceptable_iter",
    "derivative_test_first_index",
    "file_print_level",
    "filter_reset_trigger",
    "limited_memory_max_history",
    "limited_memory_max_skipping",
    "ma57_block_size",
    "ma57_node_amalgamation",
    "ma57_pivot_order",
    "ma57_small_pivot_flag",
    "max_filter_resets",
    "max_iter",
    "max_refinement_steps",
    "max_resto_iter",
    "max_soc",
    "min_refinement_steps",
    "mumps_mem_percent",
    "mumps_permuting_scaling",
    "mumps_pivot_order",
    "mumps_scaling",
    "num_linear_variables",
    "print_frequency_iter",
    "print_level",
    "watchdog_shortened_iter_trigger",
    "watchdog_trial_iter_max",
];

/// Pick the typed setter for `value`.
///
/// Integer-looking values go to the integer setter only for options IPOPT
/// registers as integers, so `tol 1` is set as a number.
pub fn classify<'a>(key: &str, value: &'a str) -> OptionValue<'a> {
    match (value.parse::<i32>(), value.parse::<f64>()) {
        (Ok(int), _) if INTEGER_OPTIONS.contains(&key) => OptionValue::Int(int),
        (_, Ok(num)) => OptionValue::Num(num),
        _ => OptionValue::Str(value),
    }
}

/// Read the lines of an existing option file, e.g. `ipopt.opt`.
///
/// Lines are returned as written, comments and blank lines included.
pub fn read_option_file(path: impl AsRef<Path>) -> BridgeResult<Vec<String>> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    Ok(contents.lines().map(str::to_string).collect())
}
