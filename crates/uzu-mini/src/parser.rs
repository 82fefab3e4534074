use crate::ast::{AtomValue, EuclidArgs, Mods, Node, SourceSpan};
use crate::error::{ParseError, Result};
use crate::lexer::{Lexer, Token};

/// Parse a mini-notation string into its syntax tree
pub fn parse(source: &str) -> Result<Node> {
    let mut parser = Parser::new(source);
    let node = parser.parse_pattern()?;
    if let Some((token, span)) = parser.peek() {
        return Err(ParseError::UnexpectedToken {
            expected: "end of input".to_string(),
            found: token.to_string(),
            span,
        });
    }
    Ok(node)
}

/// Recursive-descent parser over the mini-notation token stream
pub struct Parser<'source> {
    lexer: Lexer<'source>,
    seed_counter: u64,
}

impl<'source> Parser<'source> {
    pub fn new(source: &'source str) -> Self {
        Parser {
            lexer: Lexer::new(source),
            seed_counter: 0,
        }
    }

    fn peek(&mut self) -> Option<(Token, SourceSpan)> {
        self.lexer.peek_token()
    }

    fn next(&mut self) -> Option<(Token, SourceSpan)> {
        self.lexer.next_token()
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<SourceSpan> {
        match self.next() {
            Some((token, span)) if token == expected => Ok(span),
            Some((token, span)) => Err(ParseError::UnexpectedToken {
                expected: what.to_string(),
                found: token.to_string(),
                span,
            }),
            None => Err(ParseError::UnexpectedEof {
                expected: what.to_string(),
            }),
        }
    }

    fn close(&mut self, expected: Token, delimiter: char, open_span: SourceSpan) -> Result<SourceSpan> {
        match self.next() {
            Some((token, span)) if token == expected => Ok(span),
            Some((token, span)) => Err(ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: token.to_string(),
                span,
            }),
            None => Err(ParseError::UnclosedDelimiter {
                delimiter,
                open_span,
            }),
        }
    }

    /// Parse a full pattern: sequences separated by `,` (stack) or `|`
    /// (random choice)
    pub fn parse_pattern(&mut self) -> Result<Node> {
        let first = self.parse_sequence()?;
        match self.peek() {
            Some((Token::Comma, _)) => {
                let mut children = vec![first];
                while let Some((Token::Comma, _)) = self.peek() {
                    self.next();
                    children.push(self.parse_sequence()?);
                }
                let loc = children[0].loc().merge(children[children.len() - 1].loc());
                Ok(Node::Stack { children, loc })
            }
            Some((Token::Pipe, _)) => {
                let mut children = vec![first];
                while let Some((Token::Pipe, _)) = self.peek() {
                    self.next();
                    children.push(self.parse_sequence()?);
                }
                let loc = children[0].loc().merge(children[children.len() - 1].loc());
                let seed = self.seed_counter;
                self.seed_counter += 1;
                Ok(Node::RandomChoice {
                    children,
                    seed,
                    loc,
                })
            }
            _ => Ok(first),
        }
    }

    /// Parse space-separated elements up to a separator or closing
    /// delimiter. A single element comes back unwrapped.
    fn parse_sequence(&mut self) -> Result<Node> {
        let mut items: Vec<Node> = Vec::new();
        loop {
            match self.peek() {
                None => break,
                Some((token, span)) => match token {
                    Token::Comma
                    | Token::Pipe
                    | Token::RBracket
                    | Token::RBrace
                    | Token::RAngle
                    | Token::RParen => break,
                    Token::Underscore => {
                        self.next();
                        items.push(Node::Elongation { loc: span });
                    }
                    _ => items.push(self.parse_element()?),
                },
            }
        }
        match items.len() {
            0 => {
                let at = self
                    .peek()
                    .map(|(_, span)| span.start)
                    .unwrap_or_else(|| self.lexer.source().len());
                Ok(Node::Sequence {
                    items,
                    loc: SourceSpan::new(at, at),
                })
            }
            1 => Ok(items.into_iter().next().unwrap()),
            _ => {
                let loc = items[0].loc().merge(items[items.len() - 1].loc());
                Ok(Node::Sequence { items, loc })
            }
        }
    }

    fn parse_element(&mut self) -> Result<Node> {
        let primary = self.parse_primary()?;
        self.parse_postfix(primary)
    }

    fn parse_primary(&mut self) -> Result<Node> {
        let Some((token, span)) = self.next() else {
            return Err(ParseError::UnexpectedEof {
                expected: "a pattern element".to_string(),
            });
        };
        match token {
            Token::Word => {
                let name = self.lexer.slice(span).to_string();
                let (sample, loc) = if let Some((Token::Colon, _)) = self.peek() {
                    self.next();
                    match self.next() {
                        Some((Token::Number(n), num_span)) => {
                            (Some(n as i64), span.merge(num_span))
                        }
                        Some((found, found_span)) => {
                            return Err(ParseError::UnexpectedToken {
                                expected: "a sample number".to_string(),
                                found: found.to_string(),
                                span: found_span,
                            })
                        }
                        None => {
                            return Err(ParseError::UnexpectedEof {
                                expected: "a sample number".to_string(),
                            })
                        }
                    }
                } else {
                    (None, span)
                };
                Ok(Node::Atom {
                    value: AtomValue::Name(name),
                    sample,
                    mods: Mods::default(),
                    loc,
                })
            }
            Token::Number(n) => Ok(Node::Atom {
                value: AtomValue::Number(n),
                sample: None,
                mods: Mods::default(),
                loc: span,
            }),
            Token::Tilde | Token::Dash => Ok(Node::Rest { loc: span }),
            Token::LBracket => {
                let inner = self.parse_pattern()?;
                let close = self.close(Token::RBracket, '[', span)?;
                let children = match inner {
                    Node::Sequence { items, .. } => items,
                    other => vec![other],
                };
                Ok(Node::Subdivision {
                    children,
                    mods: Mods::default(),
                    loc: span.merge(close),
                })
            }
            Token::LAngle => {
                let mut children = Vec::new();
                loop {
                    match self.peek() {
                        Some((Token::RAngle, _)) => break,
                        Some((Token::Underscore, under_span)) => {
                            self.next();
                            children.push(Node::Elongation { loc: under_span });
                        }
                        Some(_) => children.push(self.parse_element()?),
                        None => {
                            return Err(ParseError::UnclosedDelimiter {
                                delimiter: '<',
                                open_span: span,
                            })
                        }
                    }
                }
                let close = self.close(Token::RAngle, '<', span)?;
                Ok(Node::Alternation {
                    children,
                    mods: Mods::default(),
                    loc: span.merge(close),
                })
            }
            Token::LBrace => {
                let mut groups = vec![self.parse_sequence()?];
                while let Some((Token::Comma, _)) = self.peek() {
                    self.next();
                    groups.push(self.parse_sequence()?);
                }
                let close = self.close(Token::RBrace, '{', span)?;
                let (steps, loc) = if let Some((Token::Percent, _)) = self.peek() {
                    self.next();
                    let steps = self.parse_primary()?;
                    let loc = span.merge(steps.loc());
                    (Some(Box::new(steps)), loc)
                } else {
                    (None, span.merge(close))
                };
                Ok(Node::Polymetric {
                    groups,
                    steps,
                    mods: Mods::default(),
                    loc,
                })
            }
            Token::Error => Err(ParseError::InvalidToken { span }),
            other => Err(ParseError::UnexpectedToken {
                expected: "a pattern element".to_string(),
                found: other.to_string(),
                span,
            }),
        }
    }

    /// Postfix modifiers: `*n`, `/n`, `@w`, `!n`, `?p`, `(k,n,off)`.
    /// Modifiers on rests parse but have nothing to attach to.
    fn parse_postfix(&mut self, mut node: Node) -> Result<Node> {
        loop {
            let Some((token, span)) = self.peek() else {
                break;
            };
            match token {
                Token::Star => {
                    self.next();
                    let arg = self.parse_primary()?;
                    if let Some(mods) = node.mods_mut() {
                        mods.repeat = Some(Box::new(arg));
                    }
                }
                Token::Slash => {
                    self.next();
                    let arg = self.parse_primary()?;
                    if let Some(mods) = node.mods_mut() {
                        mods.division = Some(Box::new(arg));
                    }
                }
                Token::At => {
                    self.next();
                    let weight = if let Some((Token::Number(n), _)) = self.peek() {
                        self.next();
                        n
                    } else {
                        2.0
                    };
                    if let Some(mods) = node.mods_mut() {
                        mods.weight = Some(weight);
                    }
                }
                Token::Bang => {
                    self.next();
                    let count = if let Some((Token::Number(n), _)) = self.peek() {
                        self.next();
                        n.max(0.0) as usize
                    } else {
                        node.mods()
                            .and_then(|m| m.replicate)
                            .unwrap_or(1)
                            + 1
                    };
                    if let Some(mods) = node.mods_mut() {
                        mods.replicate = Some(count);
                    }
                }
                Token::Question => {
                    self.next();
                    let probability = if let Some((Token::Number(n), _)) = self.peek() {
                        self.next();
                        n
                    } else {
                        0.5
                    };
                    if let Some(mods) = node.mods_mut() {
                        mods.probability = Some(probability);
                    }
                }
                Token::DotDot => {
                    self.next();
                    let end = self.parse_primary()?;
                    node = desugar_range(node, end)?;
                }
                Token::LParen => {
                    self.next();
                    let pulse = self.parse_sequence()?;
                    self.expect(Token::Comma, "','")?;
                    let step = self.parse_sequence()?;
                    let rotation = if let Some((Token::Comma, _)) = self.peek() {
                        self.next();
                        Some(Box::new(self.parse_sequence()?))
                    } else {
                        None
                    };
                    self.close(Token::RParen, '(', span)?;
                    if let Some(mods) = node.mods_mut() {
                        mods.euclid = Some(EuclidArgs {
                            pulse: Box::new(pulse),
                            step: Box::new(step),
                            rotation,
                        });
                    }
                }
                _ => break,
            }
        }
        Ok(node)
    }
}

/// Expand `a .. b` into the sequence of integers from `a` to `b`
/// inclusive, descending when `b < a`
fn desugar_range(start: Node, end: Node) -> Result<Node> {
    const MAX_RANGE: i64 = 4096;
    let bound = |node: &Node| match node {
        Node::Atom {
            value: AtomValue::Number(n),
            mods,
            ..
        } if mods.is_empty() => Some(*n as i64),
        _ => None,
    };
    let loc = start.loc().merge(end.loc());
    let (Some(from), Some(to)) = (bound(&start), bound(&end)) else {
        return Err(ParseError::UnexpectedToken {
            expected: "numeric range bounds".to_string(),
            found: "a pattern".to_string(),
            span: loc,
        });
    };
    if (from - to).abs() > MAX_RANGE {
        return Err(ParseError::InvalidNumber {
            value: format!("{} .. {}", from, to),
            span: loc,
        });
    }
    let numbers: Vec<i64> = if from <= to {
        (from..=to).collect()
    } else {
        (to..=from).rev().collect()
    };
    let items = numbers
        .into_iter()
        .map(|n| Node::Atom {
            value: AtomValue::Number(n as f64),
            sample: None,
            mods: Mods::default(),
            loc,
        })
        .collect();
    Ok(Node::Sequence { items, loc })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atom_name(node: &Node) -> &str {
        match node {
            Node::Atom {
                value: AtomValue::Name(name),
                ..
            } => name,
            other => panic!("expected name atom, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_single_atom() {
        let node = parse("bd").unwrap();
        assert_eq!(atom_name(&node), "bd");
        assert_eq!(node.loc(), SourceSpan::new(0, 2));
    }

    #[test]
    fn test_parse_sequence() {
        let node = parse("bd sd cp").unwrap();
        match &node {
            Node::Sequence { items, .. } => {
                assert_eq!(items.len(), 3);
                assert_eq!(atom_name(&items[0]), "bd");
                assert_eq!(atom_name(&items[2]), "cp");
            }
            other => panic!("expected sequence, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_stack_and_choice() {
        match parse("bd sd, hh").unwrap() {
            Node::Stack { children, .. } => assert_eq!(children.len(), 2),
            other => panic!("expected stack, got {:?}", other),
        }
        match parse("bd | sd | cp").unwrap() {
            Node::RandomChoice { children, seed, .. } => {
                assert_eq!(children.len(), 3);
                assert_eq!(seed, 0);
            }
            other => panic!("expected random choice, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_subdivision_and_alternation() {
        match parse("[bd sd] cp").unwrap() {
            Node::Sequence { items, .. } => match &items[0] {
                Node::Subdivision { children, .. } => assert_eq!(children.len(), 2),
                other => panic!("expected subdivision, got {:?}", other),
            },
            other => panic!("expected sequence, got {:?}", other),
        }
        match parse("<a b c>").unwrap() {
            Node::Alternation { children, .. } => assert_eq!(children.len(), 3),
            other => panic!("expected alternation, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_polymetric_with_steps() {
        match parse("{bd sd, hh oh cp}%4").unwrap() {
            Node::Polymetric { groups, steps, .. } => {
                assert_eq!(groups.len(), 2);
                assert!(steps.is_some());
            }
            other => panic!("expected polymetric, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_modifiers() {
        let node = parse("bd*2").unwrap();
        assert!(node.mods().unwrap().repeat.is_some());

        let node = parse("bd/2").unwrap();
        assert!(node.mods().unwrap().division.is_some());

        let node = parse("bd@3").unwrap();
        assert_eq!(node.mods().unwrap().weight, Some(3.0));

        let node = parse("bd!3").unwrap();
        assert_eq!(node.mods().unwrap().replicate, Some(3));

        let node = parse("bd!").unwrap();
        assert_eq!(node.mods().unwrap().replicate, Some(2));

        let node = parse("bd?").unwrap();
        assert_eq!(node.mods().unwrap().probability, Some(0.5));

        let node = parse("bd?0.2").unwrap();
        assert_eq!(node.mods().unwrap().probability, Some(0.2));
    }

    #[test]
    fn test_parse_euclid() {
        let node = parse("bd(3,8)").unwrap();
        let euclid = node.mods().unwrap().euclid.as_ref().unwrap();
        assert!(euclid.rotation.is_none());

        let node = parse("bd(3,8,2)").unwrap();
        let euclid = node.mods().unwrap().euclid.as_ref().unwrap();
        assert!(euclid.rotation.is_some());

        let node = parse("bd(<3 5>,8)").unwrap();
        let euclid = node.mods().unwrap().euclid.as_ref().unwrap();
        assert!(matches!(*euclid.pulse, Node::Alternation { .. }));
    }

    #[test]
    fn test_parse_sample_index() {
        match parse("bd:3").unwrap() {
            Node::Atom { sample, loc, .. } => {
                assert_eq!(sample, Some(3));
                assert_eq!(loc, SourceSpan::new(0, 4));
            }
            other => panic!("expected atom, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_range_desugars_to_sequence() {
        match parse("0 .. 3").unwrap() {
            Node::Sequence { items, .. } => {
                assert_eq!(items.len(), 4);
                assert!(matches!(
                    items[3],
                    Node::Atom {
                        value: AtomValue::Number(n),
                        ..
                    } if n == 3.0
                ));
            }
            other => panic!("expected sequence, got {:?}", other),
        }
        // descending and degenerate ranges
        match parse("5 .. 2").unwrap() {
            Node::Sequence { items, .. } => assert_eq!(items.len(), 4),
            other => panic!("expected sequence, got {:?}", other),
        }
        assert!(parse("bd .. 3").is_err());
        assert!(parse("0 .. 99999").is_err());
    }

    #[test]
    fn test_parse_elongation_and_rest() {
        match parse("bd _ ~ sd").unwrap() {
            Node::Sequence { items, .. } => {
                assert!(matches!(items[1], Node::Elongation { .. }));
                assert!(matches!(items[2], Node::Rest { .. }));
            }
            other => panic!("expected sequence, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_pattern_valued_repeat() {
        let node = parse("bd*<2 3>").unwrap();
        let mods = node.mods().unwrap();
        assert!(matches!(
            mods.repeat.as_deref(),
            Some(Node::Alternation { .. })
        ));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse("[bd sd"),
            Err(ParseError::UnclosedDelimiter { delimiter: '[', .. })
        ));
        assert!(matches!(parse("bd )"), Err(ParseError::UnexpectedToken { .. })));
        assert!(parse("bd(3)").is_err());
    }

    #[test]
    fn test_parse_empty_source() {
        match parse("").unwrap() {
            Node::Sequence { items, .. } => assert!(items.is_empty()),
            other => panic!("expected empty sequence, got {:?}", other),
        }
    }

    mod properties {
        use super::super::*;
        use crate::interp::interpret;
        use proptest::prelude::*;

        proptest! {
            // arbitrary strings never panic the parser
            #[test]
            fn prop_parser_never_panics(source in "[ a-z0-9\\[\\]<>{}()*/@!?:%~_,|-]{0,32}") {
                let _ = parse(&source);
            }

            // whatever parses also interprets and queries without panicking
            #[test]
            fn prop_parsed_patterns_are_queryable(
                source in "[ a-z0-9\\[\\]<>*/@!?~_,|-]{0,24}"
            ) {
                if let Ok(node) = parse(&source) {
                    let pattern = interpret(&node);
                    let _ = pattern.query_cycle(0);
                    let _ = pattern.query_cycle(7);
                }
            }
        }
    }

    #[test]
    fn test_nested_stack_in_subdivision() {
        match parse("[bd sd, hh hh hh]").unwrap() {
            Node::Subdivision { children, .. } => {
                assert_eq!(children.len(), 1);
                assert!(matches!(children[0], Node::Stack { .. }));
            }
            other => panic!("expected subdivision, got {:?}", other),
        }
    }
}
