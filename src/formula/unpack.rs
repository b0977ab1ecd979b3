use super::{
    scanner::{BracketScanner, Cursor, Token},
    Child, Diagnostic, Options, Recursion, UnpackRecord, Unpacked,
};

/// The outcome of scanning a single nesting level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scan {
    pub statements: Vec<String>,
    pub operators: String,
    /// Indices into `statements` whose text contains brackets of its own.
    pub next_level: Vec<usize>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Default, Clone)]
pub struct Unpacker {
    options: Options,
}

/// Unpacks `formula` with the default options, `[`/`]` groups and `.` placeholders.
pub fn unpack(formula: &str, depth: usize) -> Unpacked {
    Unpacker::default().unpack(formula, depth)
}

pub fn scan(formula: &str, depth: usize, options: &Options) -> Scan {
    let mut level = 0usize;
    let mut statements: Vec<String> = Vec::new();
    let mut operators = String::with_capacity(formula.len());
    let mut next_level = Vec::new();
    let mut diagnostics = Vec::new();
    let mut group_start = Cursor::default();

    for (cursor, token) in BracketScanner::new(formula, options) {
        if level == 0 {
            match token {
                Token::Open(_) => {
                    level = 1;
                    group_start = cursor;
                    statements.push(String::new());
                    operators.push(options.placeholder());
                }
                Token::Close(_) => diagnostics.push(Diagnostic::UnmatchedClose {
                    position: cursor.position,
                    line: cursor.line,
                    column: cursor.column,
                    depth,
                }),
                Token::Char(c) => operators.push(c),
            }
            continue;
        }

        match token {
            Token::Open(_) => {
                level += 1;
                let index = statements.len() - 1;
                if !next_level.contains(&index) {
                    next_level.push(index);
                }
            }
            Token::Close(_) => level -= 1,
            Token::Char(_) => {}
        }

        // The closing bracket of the outermost group is not part of the statement
        if level > 0 {
            if let Some(statement) = statements.last_mut() {
                statement.push(token.as_char());
            }
        }
    }

    if level > 0 {
        diagnostics.push(Diagnostic::UnclosedOpen {
            position: group_start.position,
            line: group_start.line,
            column: group_start.column,
            depth,
            open: level,
        });
    }

    Scan {
        statements,
        operators,
        next_level,
        diagnostics,
    }
}

impl Scan {
    pub fn into_record(self, depth: usize) -> UnpackRecord {
        UnpackRecord {
            statements: self.statements,
            operators: self.operators,
            depth,
        }
    }
}

impl Unpacker {
    pub fn new(options: Options) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Unpacks `formula`, whose fragments have already been through `depth`
    /// rounds of unpacking. Malformed brackets are logged and otherwise ignored.
    ///
    /// At most [`Options::max_depth`] further levels are unpacked; statements
    /// below that are left as text and reported as [`Diagnostic::TooDeep`].
    pub fn unpack(&self, formula: &str, depth: usize) -> Unpacked {
        self.unpack_with_diagnostics(formula, depth).0
    }

    pub fn unpack_with_diagnostics(
        &self,
        formula: &str,
        depth: usize,
    ) -> (Unpacked, Vec<Diagnostic>) {
        let mut diagnostics = Vec::new();
        let levels_left = self.options.max_depth();
        let unpacked = self.unpack_level(formula, depth, levels_left, &mut diagnostics);
        (unpacked, diagnostics)
    }

    /// Like [`Unpacker::unpack`], but fails on the first malformed bracket.
    pub fn unpack_strict(&self, formula: &str, depth: usize) -> Result<Unpacked, Diagnostic> {
        let (unpacked, diagnostics) = self.unpack_with_diagnostics(formula, depth);
        match diagnostics.into_iter().next() {
            Some(diagnostic) => Err(diagnostic),
            None => Ok(unpacked),
        }
    }

    fn unpack_level(
        &self,
        formula: &str,
        depth: usize,
        levels_left: usize,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Unpacked {
        let mut scanned = scan(formula, depth, &self.options);
        for diagnostic in &scanned.diagnostics {
            tracing::warn!(depth, "{diagnostic}");
        }
        diagnostics.append(&mut scanned.diagnostics);

        tracing::debug!(depth, next_level = ?scanned.next_level, "statements to unpack");
        let next_level = std::mem::take(&mut scanned.next_level);
        let record = scanned.into_record(depth);
        if next_level.is_empty() {
            return Unpacked::Record(record);
        }

        let indices = match self.options.recursion() {
            Recursion::FirstOnly => &next_level[..1],
            Recursion::All => &next_level[..],
        };

        if levels_left == 0 {
            for &index in indices {
                let diagnostic = Diagnostic::TooDeep {
                    index,
                    depth,
                    limit: self.options.max_depth(),
                };
                tracing::warn!(depth, "{diagnostic}");
                diagnostics.push(diagnostic);
            }
            return Unpacked::Record(record);
        }

        let children = indices
            .iter()
            .map(|&index| {
                let statement = &record.statements[index];
                tracing::debug!(depth, index, %statement, "unpacking statement");
                Child {
                    index,
                    unpacked: self.unpack_level(
                        statement,
                        depth + 1,
                        levels_left - 1,
                        diagnostics,
                    ),
                }
            })
            .collect();

        Unpacked::Nested { record, children }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::DEFAULT_MAX_DEPTH;

    fn record(statements: &[&str], operators: &str, depth: usize) -> UnpackRecord {
        UnpackRecord {
            statements: statements.iter().map(|s| s.to_string()).collect(),
            operators: operators.to_owned(),
            depth,
        }
    }

    #[test]
    fn test_no_brackets() {
        assert_eq!(unpack("A+B", 0), Unpacked::Record(record(&[], "A+B", 0)));
    }

    #[test]
    fn test_single_group() {
        assert_eq!(
            unpack("A[B+C]D", 0),
            Unpacked::Record(record(&["B+C"], "A.D", 0))
        );
    }

    #[test]
    fn test_nested_group() {
        let scanned = scan("A[B[C]D]E", 0, &Options::default());
        assert_eq!(scanned.statements, vec!["B[C]D"]);
        assert_eq!(scanned.operators, "A.E");
        assert_eq!(scanned.next_level, vec![0]);
        assert!(scanned.diagnostics.is_empty());

        assert_eq!(
            unpack("A[B[C]D]E", 0),
            Unpacked::Nested {
                record: record(&["B[C]D"], "A.E", 0),
                children: vec![Child {
                    index: 0,
                    unpacked: Unpacked::Record(record(&["C"], "B.D", 1)),
                }],
            }
        );
    }

    #[test]
    fn test_doubly_nested_group() {
        let unpacked = unpack("[[[x]]]", 0);
        let operators: Vec<_> = unpacked
            .records()
            .into_iter()
            .map(|record| (record.operators.as_str(), record.depth))
            .collect();
        assert_eq!(operators, vec![(".", 0), (".", 1), (".", 2)]);
        assert_eq!(unpacked.records()[2].statements, vec!["x"]);
    }

    #[test]
    fn test_index_recorded_once() {
        let scanned = scan("[a[b][c]]", 0, &Options::default());
        assert_eq!(scanned.statements, vec!["a[b][c]"]);
        assert_eq!(scanned.next_level, vec![0]);
    }

    #[test]
    fn test_unmatched_close() {
        let scanned = scan("A]B", 0, &Options::default());
        assert_eq!(scanned.operators, "AB");
        assert_eq!(
            scanned.diagnostics,
            vec![Diagnostic::UnmatchedClose {
                position: 1,
                line: 1,
                column: 2,
                depth: 0
            }]
        );
        assert_eq!(unpack("A]B", 0), Unpacked::Record(record(&[], "AB", 0)));
    }

    #[test]
    fn test_unclosed_open() {
        let scanned = scan("A[B[C", 2, &Options::default());
        assert_eq!(scanned.statements, vec!["B[C"]);
        assert_eq!(scanned.operators, "A.");
        assert_eq!(
            scanned.diagnostics,
            vec![Diagnostic::UnclosedOpen {
                position: 1,
                line: 1,
                column: 2,
                depth: 2,
                open: 2
            }]
        );
    }

    #[test]
    fn test_sibling_groups() {
        let first_only = unpack("[a[b]][c[d]]", 0);
        assert_eq!(first_only.record().statements, vec!["a[b]", "c[d]"]);
        assert_eq!(first_only.children().len(), 1);
        assert_eq!(first_only.children()[0].index, 0);

        let all = Unpacker::new(Options::default().with_recursion(Recursion::All))
            .unpack("[a[b]][c[d]]", 0);
        let indices: Vec<_> = all.children().iter().map(|child| child.index).collect();
        assert_eq!(indices, vec![0, 1]);
        assert_eq!(
            all.children()[1].unpacked,
            Unpacked::Record(record(&["d"], "c.", 1))
        );
    }

    #[test]
    fn test_strict() {
        let unpacker = Unpacker::default();
        assert!(unpacker.unpack_strict("A[B[C]D]E", 0).is_ok());
        assert_eq!(
            unpacker.unpack_strict("[x]]", 0),
            Err(Diagnostic::UnmatchedClose {
                position: 3,
                line: 1,
                column: 4,
                depth: 0
            })
        );
    }

    #[test]
    fn test_custom_placeholder() {
        let options = Options::default()
            .with_brackets('(', ')')
            .unwrap()
            .with_placeholder('_')
            .unwrap();
        assert_eq!(
            Unpacker::new(options).unpack("p&(q|r)", 0),
            Unpacked::Record(record(&["q|r"], "p&_", 0))
        );
    }

    #[test]
    fn test_multiline_positions() {
        let scanned = scan("[p]\n&\n  ]q[", 0, &Options::default());
        assert_eq!(
            scanned.diagnostics,
            vec![
                Diagnostic::UnmatchedClose {
                    position: 8,
                    line: 3,
                    column: 3,
                    depth: 0
                },
                Diagnostic::UnclosedOpen {
                    position: 10,
                    line: 3,
                    column: 5,
                    depth: 0,
                    open: 1
                },
            ]
        );
        assert_eq!(
            scanned.diagnostics[0].to_string(),
            "too many closing brackets, detected at line 3, column 3 (character 8, level 0)"
        );
    }

    #[test]
    fn test_deep_nesting_stops_at_limit() {
        let levels = 100_000;
        let formula = format!("{}x{}", "[".repeat(levels), "]".repeat(levels));
        let (unpacked, diagnostics) = Unpacker::default().unpack_with_diagnostics(&formula, 0);

        let records = unpacked.records();
        assert_eq!(records.len(), DEFAULT_MAX_DEPTH + 1);
        assert_eq!(records.last().unwrap().depth, DEFAULT_MAX_DEPTH);
        assert_eq!(
            diagnostics,
            vec![Diagnostic::TooDeep {
                index: 0,
                depth: DEFAULT_MAX_DEPTH,
                limit: DEFAULT_MAX_DEPTH
            }]
        );
    }

    #[test]
    fn test_max_depth_counts_from_starting_depth() {
        let options = Options::default()
            .with_max_depth(1)
            .with_recursion(Recursion::All);
        let (unpacked, diagnostics) =
            Unpacker::new(options).unpack_with_diagnostics("[[[a]]][[[b]]]", 5);
        let depths: Vec<_> = unpacked.records().iter().map(|record| record.depth).collect();
        assert_eq!(depths, vec![5, 6, 6]);
        assert_eq!(
            diagnostics,
            vec![
                Diagnostic::TooDeep {
                    index: 0,
                    depth: 6,
                    limit: 1
                },
                Diagnostic::TooDeep {
                    index: 0,
                    depth: 6,
                    limit: 1
                },
            ]
        );
        assert!(Unpacker::new(options).unpack_strict("[[a]]", 0).is_ok());
        assert!(Unpacker::new(options).unpack_strict("[[[a]]]", 0).is_err());
    }
}
