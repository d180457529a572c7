//! Selector compiler
//!
//! Turns selector text into a [`CompiledPattern`]:
//!
//! ```text
//! selector   := [ '/' ] segment ( separator segment )*
//! separator  := '/' (immediate) | '//' or whitespace (descendant)
//! segment    := '.' | '**' | snippet+
//! snippet    := name | '*' | '#' int | '[' attr ']' | call | '{' selector '}'
//! ```
//!
//! Bare names and values match literally; quoted ones are regular
//! expressions.

use crate::error::{Error, Result};
use crate::filter::{anchored_regex, literal_regex, Filter, FilterArgs};
use crate::limits;
use crate::pattern::{CompiledPattern, Relation, Stage};
use crate::registry::FilterRegistry;

/// Parses one kind of snippet; `Ok(None)` when the input is not its syntax
type SnippetParser = fn(&PatternCompiler<'_>, &mut Cursor<'_>, usize) -> Result<Option<Vec<Filter>>>;

/// Snippet parsers in priority order
const SNIPPET_PARSERS: [SnippetParser; 6] = [
    parse_name,
    parse_wildcard,
    parse_index,
    parse_attribute,
    parse_function,
    parse_block,
];

/// Compiles selectors against a filter registry
pub struct PatternCompiler<'r> {
    registry: &'r FilterRegistry,
}

impl<'r> PatternCompiler<'r> {
    pub fn new(registry: &'r FilterRegistry) -> Self {
        Self { registry }
    }

    pub fn compile(&self, selector: &str) -> Result<CompiledPattern> {
        limits::validate_selector(selector)?;

        let mut cursor = Cursor::new(selector);
        let stages = self.parse_selector(&mut cursor, 0, None)?;
        if !cursor.at_end() {
            return Err(Error::syntax(cursor.pos, "unexpected trailing input"));
        }

        tracing::debug!("Compiled selector '{}' into {} stages", selector, stages.len());
        Ok(CompiledPattern::new(selector.trim(), stages))
    }

    /// Parse stages up to end of input or the `closing` delimiter (not consumed)
    fn parse_selector(
        &self,
        cursor: &mut Cursor<'_>,
        depth: usize,
        closing: Option<char>,
    ) -> Result<Vec<Stage>> {
        cursor.skip_ws();
        if at_close(cursor, closing) {
            return match closing {
                None => Err(Error::EmptySelector),
                Some(_) => Err(Error::syntax(cursor.pos, "empty block")),
            };
        }

        let mut relation = if cursor.eat_str("//") {
            Relation::Descendant
        } else if cursor.eat('/') {
            Relation::Immediate
        } else {
            Relation::Descendant
        };

        let mut stages = Vec::new();
        loop {
            cursor.skip_ws();
            if at_close(cursor, closing) {
                return Err(Error::syntax(cursor.pos, "expected a segment after '/'"));
            }
            stages.push(self.parse_segment(cursor, relation, depth, closing)?);

            let had_ws = cursor.skip_ws();
            if at_close(cursor, closing) {
                break;
            }
            relation = if cursor.eat_str("//") {
                Relation::Descendant
            } else if cursor.eat('/') {
                Relation::Immediate
            } else if had_ws {
                Relation::Descendant
            } else {
                return Err(unexpected(cursor));
            };
        }

        Ok(stages)
    }

    fn parse_segment(
        &self,
        cursor: &mut Cursor<'_>,
        relation: Relation,
        depth: usize,
        closing: Option<char>,
    ) -> Result<Stage> {
        if cursor.starts_with("**") && cursor.is_boundary(2, closing) {
            cursor.advance(2);
            return Ok(Stage::new(Relation::Wildcard, vec![Filter::Any]));
        }
        if cursor.starts_with(".") && cursor.is_boundary(1, closing) {
            cursor.advance(1);
            return Ok(Stage::new(Relation::Current, vec![Filter::Origin]));
        }

        let mut filters = Vec::new();
        'snippets: loop {
            for parser in SNIPPET_PARSERS {
                if let Some(mut parsed) = parser(self, cursor, depth)? {
                    filters.append(&mut parsed);
                    continue 'snippets;
                }
            }
            break;
        }

        if filters.is_empty() {
            return Err(unexpected(cursor));
        }
        Ok(Stage::new(relation, filters))
    }
}

fn at_close(cursor: &Cursor<'_>, closing: Option<char>) -> bool {
    cursor.at_end() || (closing.is_some() && cursor.peek() == closing)
}

fn unexpected(cursor: &Cursor<'_>) -> Error {
    match cursor.peek() {
        Some(c) => Error::syntax(cursor.pos, format!("unexpected character '{}'", c)),
        None => Error::syntax(cursor.pos, "unexpected end of selector"),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Snippet parsers
// ─────────────────────────────────────────────────────────────────────────────

fn parse_name(
    _compiler: &PatternCompiler<'_>,
    cursor: &mut Cursor<'_>,
    _depth: usize,
) -> Result<Option<Vec<Filter>>> {
    if matches!(cursor.peek(), Some('\'' | '"')) {
        let pattern = cursor.quoted()?;
        return Ok(Some(vec![Filter::Name(anchored_regex(&pattern)?)]));
    }

    let len = cursor.ident_len();
    if len == 0 || cursor.peek_at(len) == Some('(') {
        return Ok(None);
    }
    let name = cursor.take(len);
    Ok(Some(vec![Filter::Name(literal_regex(name)?)]))
}

fn parse_wildcard(
    _compiler: &PatternCompiler<'_>,
    cursor: &mut Cursor<'_>,
    _depth: usize,
) -> Result<Option<Vec<Filter>>> {
    if cursor.peek() == Some('*') && cursor.peek_at(1) != Some('*') {
        cursor.advance(1);
        return Ok(Some(vec![Filter::Any]));
    }
    Ok(None)
}

fn parse_index(
    _compiler: &PatternCompiler<'_>,
    cursor: &mut Cursor<'_>,
    _depth: usize,
) -> Result<Option<Vec<Filter>>> {
    if !cursor.eat('#') {
        return Ok(None);
    }
    let len = cursor.count_while(|c| c.is_ascii_digit());
    if len == 0 {
        let rest = cursor.take(cursor.count_while(|c| !c.is_whitespace() && c != '/'));
        return Err(Error::InvalidIndex(format!("#{}", rest)));
    }
    let digits = cursor.take(len);
    // Only a boundary or another bracketed clause may follow the digits
    if let Some(c) = cursor.peek() {
        if !(c.is_whitespace() || matches!(c, '/' | '[' | '{' | '}')) {
            let trailing = cursor.count_while(|c| !c.is_whitespace() && c != '/');
            return Err(Error::InvalidIndex(format!("#{}{}", digits, cursor.take(trailing))));
        }
    }
    let index = digits
        .parse::<usize>()
        .map_err(|_| Error::InvalidIndex(format!("#{}", digits)))?;
    Ok(Some(vec![Filter::Index(index)]))
}

fn parse_attribute(
    _compiler: &PatternCompiler<'_>,
    cursor: &mut Cursor<'_>,
    _depth: usize,
) -> Result<Option<Vec<Filter>>> {
    let start = cursor.pos;
    if !cursor.eat('[') {
        return Ok(None);
    }
    cursor.skip_ws();

    let name = if cursor.eat('*') {
        anchored_regex(".*")?
    } else if matches!(cursor.peek(), Some('\'' | '"')) {
        anchored_regex(&cursor.quoted()?)?
    } else {
        let len = cursor.ident_len();
        if len == 0 {
            return Err(Error::syntax(cursor.pos, "expected attribute name"));
        }
        literal_regex(cursor.take(len))?
    };

    cursor.skip_ws();
    let value = if cursor.eat('=') {
        cursor.skip_ws();
        if matches!(cursor.peek(), Some('\'' | '"')) {
            Some(anchored_regex(&cursor.quoted()?)?)
        } else {
            let len = cursor.count_while(|c| c != ']');
            Some(literal_regex(cursor.take(len).trim())?)
        }
    } else {
        None
    };

    cursor.skip_ws();
    if !cursor.eat(']') {
        return Err(Error::syntax(start, "unterminated attribute clause"));
    }
    Ok(Some(vec![Filter::Attribute { name, value }]))
}

fn parse_function(
    compiler: &PatternCompiler<'_>,
    cursor: &mut Cursor<'_>,
    _depth: usize,
) -> Result<Option<Vec<Filter>>> {
    let len = cursor.ident_len();
    if len == 0 || cursor.peek_at(len) != Some('(') {
        return Ok(None);
    }
    let start = cursor.pos;
    let name = cursor.take(len).to_string();
    cursor.advance(1);

    let mut args = FilterArgs::new();
    cursor.skip_ws();
    if !cursor.eat(')') {
        loop {
            cursor.skip_ws();
            let key_len = cursor.ident_len();
            let mut lookahead = cursor.clone();
            lookahead.advance(key_len);
            lookahead.skip_ws();

            if key_len > 0 && lookahead.peek() == Some('=') {
                let key = cursor.take(key_len).to_string();
                cursor.skip_ws();
                cursor.advance(1);
                cursor.skip_ws();
                let (value, quoted) = argument_value(cursor)?;
                args.push_named(key, value, quoted);
            } else {
                let (value, quoted) = argument_value(cursor)?;
                args.push_positional(value, quoted);
            }

            cursor.skip_ws();
            if cursor.eat(',') {
                continue;
            }
            if cursor.eat(')') {
                break;
            }
            return Err(Error::syntax(start, format!("unterminated call to {}()", name)));
        }
    }

    let filter = compiler.registry.resolve(&name, &args)?;
    Ok(Some(vec![Filter::Function { name, args, filter }]))
}

fn argument_value(cursor: &mut Cursor<'_>) -> Result<(String, bool)> {
    if matches!(cursor.peek(), Some('\'' | '"')) {
        return Ok((cursor.quoted()?, true));
    }
    let len = cursor.count_while(|c| c != ',' && c != ')');
    let value = cursor.slice(cursor.pos, cursor.pos + len).trim();
    if value.is_empty() {
        return Err(Error::syntax(cursor.pos, "expected an argument"));
    }
    cursor.advance(len);
    Ok((value.to_string(), false))
}

fn parse_block(
    compiler: &PatternCompiler<'_>,
    cursor: &mut Cursor<'_>,
    depth: usize,
) -> Result<Option<Vec<Filter>>> {
    let start = cursor.pos;
    if !cursor.eat('{') {
        return Ok(None);
    }
    limits::validate_block_depth(depth + 1)?;

    let stages = compiler.parse_selector(cursor, depth + 1, Some('}'))?;
    let source = cursor.slice(start + 1, cursor.pos).trim().to_string();
    if !cursor.eat('}') {
        return Err(Error::syntax(start, "unterminated block"));
    }
    let nested = CompiledPattern::new(source, stages);
    Ok(Some(vec![Filter::Has(Box::new(nested))]))
}

// ─────────────────────────────────────────────────────────────────────────────
// Cursor
// ─────────────────────────────────────────────────────────────────────────────

/// Byte cursor over selector text
#[derive(Clone)]
struct Cursor<'s> {
    src: &'s str,
    pos: usize,
}

impl<'s> Cursor<'s> {
    fn new(src: &'s str) -> Self {
        Self { src, pos: 0 }
    }

    fn rest(&self) -> &'s str {
        &self.src[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Character `offset` bytes ahead; offsets come from ASCII-only scans
    fn peek_at(&self, offset: usize) -> Option<char> {
        self.rest().get(offset..).and_then(|s| s.chars().next())
    }

    fn starts_with(&self, s: &str) -> bool {
        self.rest().starts_with(s)
    }

    fn advance(&mut self, bytes: usize) {
        self.pos = (self.pos + bytes).min(self.src.len());
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.advance(c.len_utf8());
            true
        } else {
            false
        }
    }

    fn eat_str(&mut self, s: &str) -> bool {
        if self.starts_with(s) {
            self.advance(s.len());
            true
        } else {
            false
        }
    }

    /// Skip whitespace, reporting whether any was skipped
    fn skip_ws(&mut self) -> bool {
        let len = self.count_while(char::is_whitespace);
        self.advance(len);
        len > 0
    }

    /// Byte length of the run of characters satisfying `pred`
    fn count_while(&self, pred: impl Fn(char) -> bool) -> usize {
        self.rest()
            .char_indices()
            .find(|(_, c)| !pred(*c))
            .map(|(i, _)| i)
            .unwrap_or(self.rest().len())
    }

    fn ident_len(&self) -> usize {
        self.count_while(is_ident_char)
    }

    fn take(&mut self, bytes: usize) -> &'s str {
        let taken = &self.src[self.pos..self.pos + bytes];
        self.advance(bytes);
        taken
    }

    fn slice(&self, from: usize, to: usize) -> &'s str {
        &self.src[from..to]
    }

    /// Whether the segment ends `offset` bytes ahead
    fn is_boundary(&self, offset: usize, closing: Option<char>) -> bool {
        match self.peek_at(offset) {
            None => true,
            Some(c) => c.is_whitespace() || c == '/' || Some(c) == closing,
        }
    }

    /// Quoted string; a backslash escapes the quote character only
    fn quoted(&mut self) -> Result<String> {
        let start = self.pos;
        let quote = match self.peek() {
            Some(q @ ('\'' | '"')) => q,
            _ => return Err(Error::syntax(start, "expected a quoted string")),
        };
        self.advance(1);

        let mut out = String::new();
        let mut chars = self.rest().char_indices();
        while let Some((i, c)) = chars.next() {
            if c == quote {
                self.advance(i + 1);
                return Ok(out);
            }
            if c == '\\' {
                if let Some((_, next)) = chars.clone().next() {
                    if next == quote {
                        chars.next();
                        out.push(next);
                        continue;
                    }
                }
            }
            out.push(c);
        }
        Err(Error::syntax(start, "unterminated quoted string"))
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | ':' | '.')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(selector: &str) -> Result<CompiledPattern> {
        let registry = FilterRegistry::with_builtins();
        PatternCompiler::new(&registry).compile(selector)
    }

    fn relations(pattern: &CompiledPattern) -> Vec<Relation> {
        pattern.stages().iter().map(|s| s.relation()).collect()
    }

    #[test]
    fn test_separators() {
        let pattern = compile("a/b c//d").unwrap();
        assert_eq!(
            relations(&pattern),
            vec![
                Relation::Descendant,
                Relation::Immediate,
                Relation::Descendant,
                Relation::Descendant
            ]
        );

        let rooted = compile("/a / b").unwrap();
        assert_eq!(relations(&rooted), vec![Relation::Immediate, Relation::Immediate]);
    }

    #[test]
    fn test_special_segments() {
        let pattern = compile("a/**/b/.").unwrap();
        assert_eq!(
            relations(&pattern),
            vec![
                Relation::Descendant,
                Relation::Wildcard,
                Relation::Immediate,
                Relation::Current
            ]
        );
        assert!(matches!(pattern.stages()[1].filters(), [Filter::Any]));
        assert!(matches!(pattern.stages()[3].filters(), [Filter::Origin]));
    }

    #[test]
    fn test_snippets_combine_in_one_segment() {
        let pattern = compile("item#2[id=42][flag]type(t)").unwrap();
        let filters = pattern.stages()[0].filters();

        assert_eq!(filters.len(), 5);
        assert!(matches!(filters[0], Filter::Name(_)));
        assert!(matches!(filters[1], Filter::Index(2)));
        assert!(matches!(filters[2], Filter::Attribute { value: Some(_), .. }));
        assert!(matches!(filters[3], Filter::Attribute { value: None, .. }));
        assert!(matches!(&filters[4], Filter::Function { name, .. } if name == "type"));
    }

    #[test]
    fn test_wildcard_and_quoted_name() {
        let pattern = compile("*[id] 'item-[0-9]+'").unwrap();
        assert!(matches!(pattern.stages()[0].filters()[0], Filter::Any));
        match &pattern.stages()[1].filters()[0] {
            Filter::Name(re) => {
                assert!(re.is_match("item-12"));
                assert!(!re.is_match("item-x"));
            }
            other => panic!("expected name filter, got {other}"),
        }
    }

    #[test]
    fn test_attribute_values() {
        let pattern = compile("[ id = 4.2 ][name='a.*'][*=x]").unwrap();
        let filters = pattern.stages()[0].filters();

        match &filters[0] {
            Filter::Attribute { name, value: Some(value) } => {
                assert!(name.is_match("id"));
                assert!(value.is_match("4.2"));
                assert!(!value.is_match("402"));
            }
            other => panic!("unexpected filter {other}"),
        }
        match &filters[1] {
            Filter::Attribute { value: Some(value), .. } => assert!(value.is_match("abc")),
            other => panic!("unexpected filter {other}"),
        }
        match &filters[2] {
            Filter::Attribute { name, .. } => assert!(name.is_match("anything")),
            other => panic!("unexpected filter {other}"),
        }
    }

    #[test]
    fn test_function_arguments() {
        let pattern = compile("value( 'he, llo' ) depth(depth = 2) leaf()").unwrap();

        match &pattern.stages()[0].filters()[0] {
            Filter::Function { args, .. } => {
                assert_eq!(args.get("0"), Some("he, llo"));
                assert!(args.arg("0").unwrap().quoted);
            }
            other => panic!("unexpected filter {other}"),
        }
        match &pattern.stages()[1].filters()[0] {
            Filter::Function { args, .. } => assert_eq!(args.get("depth"), Some("2")),
            other => panic!("unexpected filter {other}"),
        }
        match &pattern.stages()[2].filters()[0] {
            Filter::Function { args, .. } => assert!(args.is_empty()),
            other => panic!("unexpected filter {other}"),
        }
    }

    #[test]
    fn test_block() {
        let pattern = compile("p{b/i}[x]").unwrap();
        let filters = pattern.stages()[0].filters();

        match &filters[1] {
            Filter::Has(nested) => {
                assert_eq!(nested.source(), "b/i");
                assert_eq!(nested.len(), 2);
            }
            other => panic!("expected block, got {other}"),
        }
        assert!(matches!(filters[2], Filter::Attribute { .. }));
    }

    #[test]
    fn test_compile_errors() {
        assert!(matches!(compile(""), Err(Error::EmptySelector)));
        assert!(matches!(compile("   "), Err(Error::EmptySelector)));
        assert!(matches!(compile("#x"), Err(Error::InvalidIndex(_))));
        assert!(matches!(compile("#99999999999999999999999"), Err(Error::InvalidIndex(_))));
        assert!(matches!(compile("nope()"), Err(Error::UnknownFunction(_))));
        assert!(matches!(compile("depth()"), Err(Error::InvalidArgument { .. })));
        assert!(matches!(compile("'('"), Err(Error::InvalidRegex { .. })));
        assert!(matches!(compile("a["), Err(Error::Syntax { .. })));
        assert!(matches!(compile("a[id"), Err(Error::Syntax { .. })));
        assert!(matches!(compile("a/"), Err(Error::Syntax { .. })));
        assert!(matches!(compile("a/ "), Err(Error::Syntax { .. })));
        assert!(matches!(compile("a{}"), Err(Error::Syntax { .. })));
        assert!(matches!(compile("a{b"), Err(Error::Syntax { .. })));
        assert!(matches!(compile("a}"), Err(Error::Syntax { .. })));
        assert!(matches!(compile("a**"), Err(Error::Syntax { .. })));
        assert!(matches!(compile("'abc"), Err(Error::Syntax { .. })));
        assert!(matches!(compile("type(x"), Err(Error::Syntax { .. })));
        assert!(matches!(compile("a=b"), Err(Error::Syntax { .. })));
        assert!(matches!(compile("type(,)"), Err(Error::Syntax { .. })));
        assert!(matches!(compile("value(x,)"), Err(Error::Syntax { .. })));
        assert!(matches!(compile("value(key=)"), Err(Error::Syntax { .. })));
        assert!(matches!(compile("#1a"), Err(Error::InvalidIndex(_))));
        assert!(matches!(compile("item#0leaf()"), Err(Error::InvalidIndex(_))));
    }

    #[test]
    fn test_index_followed_by_clause() {
        let pattern = compile("#1[id] #0{leaf()}/#2").unwrap();
        let stages = pattern.stages();
        assert_eq!(stages.len(), 3);
        assert!(matches!(stages[0].filters()[0], Filter::Index(1)));
        assert!(matches!(stages[1].filters()[1], Filter::Has(_)));
        assert!(matches!(stages[2].filters()[0], Filter::Index(2)));
    }

    #[test]
    fn test_errors_are_compile_errors() {
        for selector in ["", "#x", "nope()", "a[", "'('"] {
            assert!(compile(selector).unwrap_err().is_compile_error());
        }
    }

    #[test]
    fn test_escaped_quote() {
        let pattern = compile(r#"[title="say \"hi\""]"#).unwrap();
        match &pattern.stages()[0].filters()[0] {
            Filter::Attribute { value: Some(value), .. } => {
                assert!(value.is_match(r#"say "hi""#));
            }
            other => panic!("unexpected filter {other}"),
        }
    }
}
