//! Program image representation and parsing.
//!
//! A program image is the ordered sequence of signed integers loaded into a
//! machine's address space before execution. The text format is a flat
//! comma-separated list of decimal integers, optionally spread across several
//! lines; whitespace around each token is ignored.

use crate::machine::errors::VMError;
use std::str::FromStr;

/// An immutable program image.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Program {
    words: Vec<i64>,
}

impl Program {
    /// Creates a program image from raw instruction words.
    ///
    /// # Errors
    /// Returns [`VMError::EmptyProgram`] when `words` is empty; a machine
    /// could never reach a halt instruction in an empty image.
    pub fn new(words: Vec<i64>) -> Result<Self, VMError> {
        if words.is_empty() {
            return Err(VMError::EmptyProgram);
        }
        Ok(Self { words })
    }

    /// Returns the instruction words of this image.
    pub fn words(&self) -> &[i64] {
        &self.words
    }

    /// Returns the number of words in this image.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Returns true when the image holds no words.
    ///
    /// Always false for a constructed [`Program`]; exists for the usual
    /// `len`/`is_empty` pairing.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl FromStr for Program {
    type Err = VMError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(VMError::EmptyProgram);
        }

        let mut words = Vec::new();
        for token in s.split(',') {
            let trimmed = token.trim();
            let word = trimmed.parse::<i64>().map_err(|_| VMError::InvalidToken {
                token: trimmed.to_string(),
            })?;
            words.push(word);
        }
        Program::new(words)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_line() {
        let program: Program = "1,2,3,4,5".parse().unwrap();
        assert_eq!(program.words(), &[1, 2, 3, 4, 5]);
    }

    #[test]
    fn parses_multiline_with_whitespace() {
        let text = "1,9,10,3,\n2,3,11,0,\n99,\n30,40,50\n";
        let program: Program = text.parse().unwrap();
        assert_eq!(program.words(), &[1, 9, 10, 3, 2, 3, 11, 0, 99, 30, 40, 50]);
    }

    #[test]
    fn parses_negative_values() {
        let program: Program = "109,-7,204, -1,99".parse().unwrap();
        assert_eq!(program.words(), &[109, -7, 204, -1, 99]);
    }

    #[test]
    fn rejects_bad_token() {
        let err = "1,two,3".parse::<Program>().unwrap_err();
        assert!(matches!(err, VMError::InvalidToken { token } if token == "two"));
    }

    #[test]
    fn rejects_empty_input() {
        assert!(matches!(
            "".parse::<Program>(),
            Err(VMError::EmptyProgram)
        ));
        assert!(matches!(
            "  \n ".parse::<Program>(),
            Err(VMError::EmptyProgram)
        ));
    }

    #[test]
    fn rejects_trailing_comma() {
        assert!("1,2,".parse::<Program>().is_err());
    }
}
