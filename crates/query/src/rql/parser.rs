//! Recursive descent parser for RQL filters and options.

use serde_json::Number;

use super::{CompareOp, RqlNode, RqlOption, RqlSortKey};
use crate::criteria::Literal;
use crate::error::{QueryError, QueryResult};
use crate::options::SortDirection;

/// Maximum nesting of query operators in a single filter.
pub const MAX_DEPTH: usize = 256;

/// Parser for RQL filter and option strings.
pub struct RqlParser<'a> {
    input: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> RqlParser<'a> {
    /// Creates a new parser positioned at the start of `input`.
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            depth: 0,
        }
    }

    /// Parses a complete filter expression.
    pub fn parse_filter(input: &str) -> QueryResult<RqlNode> {
        let mut parser = RqlParser::new(input);
        let node = parser.parse_query()?;
        parser.expect_end()?;
        Ok(node)
    }

    /// Parses a comma-joined list of options.
    pub fn parse_options(input: &str) -> QueryResult<Vec<RqlOption>> {
        let mut parser = RqlParser::new(input);
        let mut options = vec![parser.parse_option()?];
        while parser.try_consume(',') {
            options.push(parser.parse_option()?);
        }
        parser.expect_end()?;
        Ok(options)
    }

    fn error_at(&self, position: usize, message: impl Into<String>) -> QueryError {
        QueryError::InvalidFilterSyntax {
            message: message.into(),
            position,
        }
    }

    fn error(&self, message: impl Into<String>) -> QueryError {
        self.error_at(self.pos, message)
    }

    /// Skips whitespace characters.
    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    /// Peeks at the next character without consuming it.
    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    /// Consumes and returns the next character.
    fn consume(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// Consumes `expected` if it is the next non-whitespace character.
    fn try_consume(&mut self, expected: char) -> bool {
        self.skip_whitespace();
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> QueryResult<()> {
        self.skip_whitespace();
        match self.peek() {
            Some(c) if c == expected => {
                self.pos += c.len_utf8();
                Ok(())
            }
            Some(c) => Err(self.error(format!("expected '{}' but found '{}'", expected, c))),
            None => Err(self.error(format!(
                "expected '{}' but reached end of input",
                expected
            ))),
        }
    }

    fn expect_end(&mut self) -> QueryResult<()> {
        self.skip_whitespace();
        if self.pos < self.input.len() {
            return Err(self.error(format!(
                "unexpected characters after expression: '{}'",
                &self.input[self.pos..]
            )));
        }
        Ok(())
    }

    /// Reads an operator name or keyword.
    fn parse_word(&mut self) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !c.is_ascii_alphabetic() {
                break;
            }
            self.pos += 1;
        }
        &self.input[start..self.pos]
    }

    fn parse_query(&mut self) -> QueryResult<RqlNode> {
        self.skip_whitespace();
        if self.depth >= MAX_DEPTH {
            return Err(self.error(format!("filter nesting exceeds {} levels", MAX_DEPTH)));
        }
        self.depth += 1;
        let node = self.parse_operator();
        self.depth -= 1;
        node
    }

    fn parse_operator(&mut self) -> QueryResult<RqlNode> {
        let start = self.pos;
        let name = self.parse_word();
        if name.is_empty() {
            return Err(self.error("expected a query operator"));
        }
        self.expect('(')?;

        let node = match name {
            "and" => RqlNode::And(self.parse_query_list()?),
            "or" => RqlNode::Or(self.parse_query_list()?),
            "not" => RqlNode::Not(Box::new(self.parse_query()?)),
            "exists" => RqlNode::Exists {
                property: self.parse_property()?,
            },
            "in" => {
                let property = self.parse_property()?;
                self.expect(',')?;
                let mut values = vec![self.parse_value()?];
                while self.try_consume(',') {
                    values.push(self.parse_value()?);
                }
                RqlNode::In { property, values }
            }
            other => {
                let op = CompareOp::parse(other)
                    .ok_or_else(|| self.error_at(start, format!("unknown operator '{}'", other)))?;
                let property = self.parse_property()?;
                self.expect(',')?;
                self.skip_whitespace();
                let value_pos = self.pos;
                let value = self.parse_value()?;
                if op == CompareOp::Like && !matches!(value, Literal::String(_)) {
                    return Err(self.error_at(value_pos, "'like' requires a string value"));
                }
                RqlNode::Compare {
                    op,
                    property,
                    value,
                }
            }
        };

        self.expect(')')?;
        Ok(node)
    }

    fn parse_query_list(&mut self) -> QueryResult<Vec<RqlNode>> {
        let mut children = vec![self.parse_query()?];
        while self.try_consume(',') {
            children.push(self.parse_query()?);
        }
        Ok(children)
    }

    /// Reads a property path up to the next delimiter.
    fn parse_property(&mut self) -> QueryResult<String> {
        self.skip_whitespace();
        let start = self.pos;
        while let Some(c) = self.peek() {
            if matches!(c, ',' | '(' | ')' | '"') || c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
        if start == self.pos {
            return Err(self.error("expected a property path"));
        }
        Ok(self.input[start..self.pos].to_string())
    }

    fn parse_value(&mut self) -> QueryResult<Literal> {
        self.skip_whitespace();
        match self.peek() {
            Some('"') => self.parse_string().map(Literal::String),
            Some(c) if c == '-' || c.is_ascii_digit() => self.parse_number(),
            Some(_) => {
                let start = self.pos;
                match self.parse_word() {
                    "true" => Ok(Literal::Bool(true)),
                    "false" => Ok(Literal::Bool(false)),
                    "null" => Ok(Literal::Null),
                    _ => Err(self.error_at(start, "expected a string, number, boolean or null")),
                }
            }
            None => Err(self.error("expected a value but reached end of input")),
        }
    }

    /// Parses a double-quoted string with `\"` and `\\` escapes.
    fn parse_string(&mut self) -> QueryResult<String> {
        let start = self.pos;
        self.consume();

        let mut value = String::new();
        while let Some(c) = self.consume() {
            match c {
                '"' => return Ok(value),
                '\\' => match self.consume() {
                    Some(escaped @ ('"' | '\\')) => value.push(escaped),
                    Some(other) => {
                        return Err(self.error_at(
                            self.pos - other.len_utf8() - 1,
                            format!("invalid escape sequence '\\{}'", other),
                        ));
                    }
                    None => break,
                },
                c => value.push(c),
            }
        }

        Err(self.error_at(start, "unterminated string"))
    }

    fn parse_number(&mut self) -> QueryResult<Literal> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.pos += 1;
        }
        while let Some(c) = self.peek() {
            if !(c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-')) {
                break;
            }
            self.pos += 1;
        }

        let text = &self.input[start..self.pos];
        serde_json::from_str::<Number>(text)
            .map(Literal::Number)
            .map_err(|_| self.error_at(start, format!("invalid number '{}'", text)))
    }

    fn parse_option(&mut self) -> QueryResult<RqlOption> {
        self.skip_whitespace();
        let start = self.pos;
        let name = self.parse_word();
        let option = match name {
            "sort" => {
                self.expect('(')?;
                let mut keys = vec![self.parse_sort_key()?];
                while self.try_consume(',') {
                    keys.push(self.parse_sort_key()?);
                }
                RqlOption::Sort(keys)
            }
            "limit" => {
                self.expect('(')?;
                let skip = self.parse_unsigned()?;
                self.expect(',')?;
                let count = self.parse_unsigned()?;
                RqlOption::Limit { skip, count }
            }
            "" => return Err(self.error("expected an option")),
            other => return Err(self.error_at(start, format!("unknown option '{}'", other))),
        };
        self.expect(')')?;
        Ok(option)
    }

    fn parse_sort_key(&mut self) -> QueryResult<RqlSortKey> {
        self.skip_whitespace();
        let direction = match self.peek() {
            Some('+') => SortDirection::Ascending,
            Some('-') => SortDirection::Descending,
            _ => return Err(self.error("sort keys must start with '+' or '-'")),
        };
        self.pos += 1;
        let property = self.parse_property()?;
        Ok(RqlSortKey {
            property,
            direction,
        })
    }

    fn parse_unsigned(&mut self) -> QueryResult<u64> {
        self.skip_whitespace();
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        let text = &self.input[start..self.pos];
        if text.is_empty() {
            return Err(self.error("expected a non-negative integer"));
        }
        text.parse::<u64>()
            .map_err(|_| self.error_at(start, format!("integer '{}' is out of range", text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> RqlNode {
        RqlParser::parse_filter(input).unwrap()
    }

    fn compare(op: CompareOp, property: &str, value: Literal) -> RqlNode {
        RqlNode::Compare {
            op,
            property: property.to_string(),
            value,
        }
    }

    #[test]
    fn test_parse_simple_comparison() {
        assert_eq!(
            parse(r#"eq(attributes/color,"red")"#),
            compare(CompareOp::Eq, "attributes/color", Literal::from("red"))
        );
    }

    #[test]
    fn test_parse_literals() {
        assert_eq!(
            parse("gt(attributes/n,-1.5e3)"),
            compare(
                CompareOp::Gt,
                "attributes/n",
                Literal::Number(serde_json::from_str("-1.5e3").unwrap())
            )
        );
        assert_eq!(
            parse("ne(attributes/b,true)"),
            compare(CompareOp::Ne, "attributes/b", Literal::Bool(true))
        );
        assert_eq!(
            parse("eq(attributes/b,null)"),
            compare(CompareOp::Eq, "attributes/b", Literal::Null)
        );
    }

    #[test]
    fn test_parse_string_escapes() {
        assert_eq!(
            parse(r#"eq(attributes/s,"a\"b\\c")"#),
            compare(CompareOp::Eq, "attributes/s", Literal::from(r#"a"b\c"#))
        );
    }

    #[test]
    fn test_parse_nested_logical() {
        let node = parse(
            r#"and(eq(thingId,"ns:a"), or(exists(features/f), not(like(attributes/x,"a*"))))"#,
        );
        match node {
            RqlNode::And(children) => {
                assert_eq!(children.len(), 2);
                match &children[1] {
                    RqlNode::Or(inner) => {
                        assert_eq!(
                            inner[0],
                            RqlNode::Exists {
                                property: "features/f".to_string()
                            }
                        );
                        assert!(matches!(inner[1], RqlNode::Not(_)));
                    }
                    other => panic!("Expected or, got {:?}", other),
                }
            }
            other => panic!("Expected and, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_in() {
        assert_eq!(
            parse(r#"in(attributes/c,"a",2)"#),
            RqlNode::In {
                property: "attributes/c".to_string(),
                values: vec![Literal::from("a"), Literal::from(2)],
            }
        );
    }

    #[test]
    fn test_syntax_errors_report_position() {
        match RqlParser::parse_filter(r#"eq(attributes/a,"x""#) {
            Err(QueryError::InvalidFilterSyntax { position, .. }) => assert_eq!(position, 19),
            other => panic!("Expected syntax error, got {:?}", other),
        }
        match RqlParser::parse_filter(r#"foo(attributes/a,1)"#) {
            Err(QueryError::InvalidFilterSyntax { position, message }) => {
                assert_eq!(position, 0);
                assert!(message.contains("foo"));
            }
            other => panic!("Expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn test_syntax_errors() {
        for input in [
            "",
            "eq(attributes/a)",
            "eq(attributes/a,\"x)",
            "like(attributes/a,1)",
            "and()",
            "eq(attributes/a,1) trailing",
            "eq(attributes/a,\"\\n\")",
            "eq(attributes/a,yes)",
        ] {
            assert!(
                matches!(
                    RqlParser::parse_filter(input),
                    Err(QueryError::InvalidFilterSyntax { .. })
                ),
                "expected syntax error for '{}'",
                input
            );
        }
    }

    fn nested_not(depth: usize) -> String {
        format!(
            "{}eq(thingId,\"a\"){}",
            "not(".repeat(depth),
            ")".repeat(depth)
        )
    }

    #[test]
    fn test_nesting_up_to_limit_parses() {
        // The innermost comparison is one level itself.
        assert!(RqlParser::parse_filter(&nested_not(MAX_DEPTH - 1)).is_ok());
    }

    #[test]
    fn test_nesting_beyond_limit_is_rejected() {
        match RqlParser::parse_filter(&nested_not(MAX_DEPTH)) {
            Err(QueryError::InvalidFilterSyntax { message, position }) => {
                assert!(message.contains("nesting"));
                assert_eq!(position, MAX_DEPTH * 4);
            }
            other => panic!("Expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn test_very_deep_nesting_is_an_error() {
        let input = nested_not(100_000);
        assert!(matches!(
            RqlParser::parse_filter(&input),
            Err(QueryError::InvalidFilterSyntax { .. })
        ));

        let input = format!("{}exists(thingId){}", "and(".repeat(100_000), ")".repeat(100_000));
        assert!(matches!(
            RqlParser::parse_filter(&input),
            Err(QueryError::InvalidFilterSyntax { .. })
        ));
    }

    #[test]
    fn test_parse_options() {
        let options = RqlParser::parse_options("sort(+thingId,-attributes/a),limit(10,5)").unwrap();
        assert_eq!(
            options,
            vec![
                RqlOption::Sort(vec![
                    RqlSortKey {
                        property: "thingId".to_string(),
                        direction: SortDirection::Ascending,
                    },
                    RqlSortKey {
                        property: "attributes/a".to_string(),
                        direction: SortDirection::Descending,
                    },
                ]),
                RqlOption::Limit { skip: 10, count: 5 },
            ]
        );
    }

    #[test]
    fn test_parse_options_errors() {
        for input in ["sort(thingId)", "limit(1)", "limit(-1,2)", "size(3)", "sort()"] {
            assert!(
                RqlParser::parse_options(input).is_err(),
                "expected error for '{}'",
                input
            );
        }
    }
}
