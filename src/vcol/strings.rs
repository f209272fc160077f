//! String transforms: character slicing and regex matching.

use std::any::Any;

use regex::Regex;

use crate::column::{Column, ColumnImpl};
use crate::error::{Error, Result};
use crate::types::Stype;

fn check_str(col: &Column) -> Result<()> {
    if col.stype() != Stype::Str {
        return Err(Error::TypeMismatch {
            expected: Stype::Str,
            found: col.stype(),
        });
    }
    Ok(())
}

/// Character-based substring of each string value. Bounds follow slicing
/// conventions from dynamic languages: negative positions count from the end
/// and out-of-range bounds clamp instead of erroring.
#[derive(Debug)]
pub struct StrSliceColumn {
    source: Column,
    start: Option<i64>,
    stop: Option<i64>,
}

/// A view slicing each string of `source` to characters `[start, stop)`.
pub fn str_slice(source: &Column, start: Option<i64>, stop: Option<i64>) -> Result<Column> {
    check_str(source)?;
    Ok(Column::new(StrSliceColumn {
        source: source.clone(),
        start,
        stop,
    }))
}

fn clamp_bound(bound: Option<i64>, default: usize, nchars: usize) -> usize {
    match bound {
        None => default,
        Some(b) if b < 0 => nchars.saturating_sub(b.unsigned_abs() as usize),
        Some(b) => (b as usize).min(nchars),
    }
}

impl ColumnImpl for StrSliceColumn {
    fn nrows(&self) -> usize {
        self.source.nrows()
    }

    fn stype(&self) -> Stype {
        Stype::Str
    }

    fn is_virtual(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn children(&self) -> Vec<Column> {
        vec![self.source.clone()]
    }

    fn get_str(&self, row: usize, out: &mut String) -> bool {
        let mut full = String::new();
        if !self.source.get_str(row, &mut full) {
            out.clear();
            return false;
        }
        let nchars = full.chars().count();
        let start = clamp_bound(self.start, 0, nchars);
        let stop = clamp_bound(self.stop, nchars, nchars);
        out.clear();
        if start < stop {
            out.extend(full.chars().skip(start).take(stop - start));
        }
        true
    }
}

/// Boolean (int8) regex test of each string value.
#[derive(Debug)]
pub struct ReMatchColumn {
    source: Column,
    pattern: Regex,
}

/// An int8 column holding 1 where the whole string matches `pattern`, 0 where
/// it does not, and missing where the input is missing.
pub fn re_match(source: &Column, pattern: &str) -> Result<Column> {
    check_str(source)?;
    // Anchor the pattern so the whole value must match.
    let anchored = Regex::new(&format!("\\A(?:{})\\z", pattern))?;
    Ok(Column::new(ReMatchColumn {
        source: source.clone(),
        pattern: anchored,
    }))
}

impl ColumnImpl for ReMatchColumn {
    fn nrows(&self) -> usize {
        self.source.nrows()
    }

    fn stype(&self) -> Stype {
        Stype::Int8
    }

    fn is_virtual(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn children(&self) -> Vec<Column> {
        vec![self.source.clone()]
    }

    fn get_int8(&self, row: usize) -> Option<i8> {
        let mut value = String::new();
        if !self.source.get_str(row, &mut value) {
            return None;
        }
        Some(self.pattern.is_match(&value) as i8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[Option<&str>]) -> Column {
        Column::from_strings(values.iter().map(|v| v.map(String::from)).collect()).unwrap()
    }

    #[test]
    fn test_str_slice() {
        let col = strings(&[Some("hello"), None, Some("ab")]);
        let sliced = str_slice(&col, Some(1), Some(4)).unwrap();
        assert_eq!(sliced.get::<String>(0), Some("ell".to_string()));
        assert_eq!(sliced.get::<String>(1), None);
        // Out-of-range stop clamps to the string's end.
        assert_eq!(sliced.get::<String>(2), Some("b".to_string()));
    }

    #[test]
    fn test_str_slice_negative_bounds() {
        let col = strings(&[Some("columnar")]);
        let tail = str_slice(&col, Some(-3), None).unwrap();
        assert_eq!(tail.get::<String>(0), Some("nar".to_string()));
        let trimmed = str_slice(&col, None, Some(-2)).unwrap();
        assert_eq!(trimmed.get::<String>(0), Some("column".to_string()));
    }

    #[test]
    fn test_str_slice_is_char_based() {
        let col = strings(&[Some("año")]);
        let mid = str_slice(&col, Some(1), Some(2)).unwrap();
        assert_eq!(mid.get::<String>(0), Some("ñ".to_string()));
    }

    #[test]
    fn test_empty_slice() {
        let col = strings(&[Some("abc")]);
        let none = str_slice(&col, Some(2), Some(1)).unwrap();
        assert_eq!(none.get::<String>(0), Some(String::new()));
    }

    #[test]
    fn test_re_match() {
        let col = strings(&[Some("ab12"), Some("abc"), None]);
        let matched = re_match(&col, "[a-z]+\\d+").unwrap();
        assert_eq!(matched.stype(), Stype::Int8);
        assert_eq!(matched.get::<i8>(0), Some(1));
        assert_eq!(matched.get::<i8>(1), Some(0));
        assert_eq!(matched.get::<i8>(2), None);
    }

    #[test]
    fn test_re_match_is_full_match() {
        let col = strings(&[Some("xxabcxx")]);
        let matched = re_match(&col, "abc").unwrap();
        assert_eq!(matched.get::<i8>(0), Some(0));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(re_match(&strings(&[Some("a")]), "(").is_err());
    }
}
