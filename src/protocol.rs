use crate::commands::DbCommand;
use crate::db_types::Predicate;
use crate::error::{DbError, Result};
use crate::parser::{parse_condition, parse_equality, parse_value_list};

// Command verbs
pub const CMD_EXIT: &str = "exit";
pub const CMD_HELP: &str = "help";
pub const CMD_CREATE_TABLE: &str = "create_table";
pub const CMD_LIST_TABLES: &str = "list_tables";
pub const CMD_DROP_TABLE: &str = "drop_table";
pub const CMD_INSERT: &str = "insert";
pub const CMD_SELECT: &str = "select";
pub const CMD_UPDATE: &str = "update";
pub const CMD_DELETE: &str = "delete";
pub const CMD_INFO: &str = "info";

// Usage lines
pub const USAGE_CREATE_TABLE: &str = "create_table <table> <column:type> ...";
pub const USAGE_DROP_TABLE: &str = "drop_table <table>";
pub const USAGE_INSERT: &str = "insert into <table> values (<value1>, <value2>, ...)";
pub const USAGE_SELECT: &str = "select from <table> [where <column> <op> <value>]";
pub const USAGE_UPDATE: &str = "update <table> set <column> = <value> where <column> = <value>";
pub const USAGE_DELETE: &str = "delete from <table> [where <column> = <value>]";
pub const USAGE_INFO: &str = "info <table>";

/// One shell-style word. `text` has quotes and escapes resolved; `raw`
/// is the word exactly as typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub raw: String,
}

impl Token {
    fn is_keyword(&self, keyword: &str) -> bool {
        self.raw.eq_ignore_ascii_case(keyword)
    }
}

/// Splits a line the way a POSIX shell would: whitespace separates,
/// single quotes are literal, double quotes allow `\"` and `\\`, and a
/// bare backslash escapes the next character.
pub fn tokenize(line: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        if chars.peek().is_none() {
            break;
        }

        let mut text = String::new();
        let mut raw = String::new();
        while let Some(ch) = chars.next_if(|c| !c.is_whitespace()) {
            raw.push(ch);
            match ch {
                '\'' => loop {
                    match chars.next() {
                        Some('\'') => {
                            raw.push('\'');
                            break;
                        }
                        Some(c) => {
                            raw.push(c);
                            text.push(c);
                        }
                        None => return Err(unterminated('\'')),
                    }
                },
                '"' => loop {
                    match chars.next() {
                        Some('"') => {
                            raw.push('"');
                            break;
                        }
                        Some('\\') => {
                            raw.push('\\');
                            match chars.next() {
                                Some(c @ ('"' | '\\')) => {
                                    raw.push(c);
                                    text.push(c);
                                }
                                Some(c) => {
                                    raw.push(c);
                                    text.push('\\');
                                    text.push(c);
                                }
                                None => return Err(unterminated('"')),
                            }
                        }
                        Some(c) => {
                            raw.push(c);
                            text.push(c);
                        }
                        None => return Err(unterminated('"')),
                    }
                },
                '\\' => {
                    if let Some(c) = chars.next() {
                        raw.push(c);
                        text.push(c);
                    }
                }
                c => text.push(c),
            }
        }
        tokens.push(Token { text, raw });
    }

    Ok(tokens)
}

fn unterminated(quote: char) -> DbError {
    DbError::Format(format!("no closing quotation ({})", quote))
}

/// Walks the tokens of one command line.
pub struct Cursor<'a> {
    tokens: &'a [Token],
    pos: usize,
    usage: &'static str,
}

impl<'a> Cursor<'a> {
    pub fn new(tokens: &'a [Token], usage: &'static str) -> Self {
        Self {
            tokens,
            pos: 0,
            usage,
        }
    }

    fn usage(&self) -> DbError {
        DbError::Usage(self.usage)
    }

    fn take(&mut self) -> Result<&'a Token> {
        let token = self.tokens.get(self.pos).ok_or_else(|| self.usage())?;
        self.pos += 1;
        Ok(token)
    }

    fn keyword(&mut self, keyword: &str) -> Result<()> {
        match self.take()? {
            token if token.is_keyword(keyword) => Ok(()),
            _ => Err(self.usage()),
        }
    }

    fn ident(&mut self) -> Result<String> {
        Ok(self.take()?.text.clone())
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn finish(&self) -> Result<()> {
        if self.is_at_end() {
            Ok(())
        } else {
            Err(self.usage())
        }
    }

    /// Remaining tokens as typed, rejoined with single spaces.
    fn rest_raw(&mut self) -> Result<String> {
        if self.is_at_end() {
            return Err(self.usage());
        }
        let rest = join_raw(&self.tokens[self.pos..]);
        self.pos = self.tokens.len();
        Ok(rest)
    }

    /// Raw text up to (not including) the next unquoted `keyword`.
    fn raw_until(&mut self, keyword: &str) -> Result<String> {
        let end = self.tokens[self.pos..]
            .iter()
            .position(|t| t.is_keyword(keyword))
            .map(|i| self.pos + i)
            .ok_or_else(|| self.usage())?;
        if end == self.pos {
            return Err(self.usage());
        }
        let clause = join_raw(&self.tokens[self.pos..end]);
        self.pos = end;
        Ok(clause)
    }
}

fn join_raw(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(|t| t.raw.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parses one input line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<DbCommand>> {
    let tokens = tokenize(line)?;
    let Some(first) = tokens.first() else {
        return Ok(None);
    };
    log::debug!("tokens: {:?}", tokens.iter().map(|t| &t.text).collect::<Vec<_>>());

    let verb = first.text.to_lowercase();
    let args = &tokens[1..];
    let command = match verb.as_str() {
        CMD_EXIT => DbCommand::Exit,
        CMD_HELP => DbCommand::Help,
        CMD_LIST_TABLES => DbCommand::ListTables,
        CMD_CREATE_TABLE => parse_create_table(args)?,
        CMD_DROP_TABLE => {
            let mut c = Cursor::new(args, USAGE_DROP_TABLE);
            let table = c.ident()?;
            c.finish()?;
            DbCommand::DropTable { table }
        }
        CMD_INFO => {
            let mut c = Cursor::new(args, USAGE_INFO);
            let table = c.ident()?;
            c.finish()?;
            DbCommand::Info { table }
        }
        CMD_INSERT => parse_insert(args)?,
        CMD_SELECT => parse_select(args)?,
        CMD_UPDATE => parse_update(args)?,
        CMD_DELETE => parse_delete(args)?,
        _ => return Err(DbError::UnknownCommand(verb)),
    };
    Ok(Some(command))
}

fn parse_create_table(args: &[Token]) -> Result<DbCommand> {
    if args.len() < 2 {
        return Err(DbError::Usage(USAGE_CREATE_TABLE));
    }
    Ok(DbCommand::CreateTable {
        table: args[0].text.clone(),
        columns: args[1..].iter().map(|t| t.text.clone()).collect(),
    })
}

fn parse_insert(args: &[Token]) -> Result<DbCommand> {
    let mut c = Cursor::new(args, USAGE_INSERT);
    c.keyword("into")?;
    let table = c.ident()?;
    c.keyword("values")?;
    let values = parse_value_list(&c.rest_raw()?)?;
    Ok(DbCommand::Insert { table, values })
}

fn parse_select(args: &[Token]) -> Result<DbCommand> {
    let mut c = Cursor::new(args, USAGE_SELECT);
    c.keyword("from")?;
    let table = c.ident()?;
    if c.is_at_end() {
        return Ok(DbCommand::Select {
            table,
            condition: None,
        });
    }
    c.keyword("where")?;
    let condition = parse_condition(&c.rest_raw()?)?;
    Ok(DbCommand::Select {
        table,
        condition: Some(condition),
    })
}

fn parse_update(args: &[Token]) -> Result<DbCommand> {
    let mut c = Cursor::new(args, USAGE_UPDATE);
    let table = c.ident()?;
    c.keyword("set")?;
    let assignments = parse_equality(&c.raw_until("where")?)?;
    c.keyword("where")?;
    let predicate = parse_equality(&c.rest_raw()?)?;
    Ok(DbCommand::Update {
        table,
        assignments,
        predicate,
    })
}

fn parse_delete(args: &[Token]) -> Result<DbCommand> {
    let mut c = Cursor::new(args, USAGE_DELETE);
    c.keyword("from")?;
    let table = c.ident()?;
    if c.is_at_end() {
        return Ok(DbCommand::Delete {
            table,
            predicate: Predicate::new(),
        });
    }
    c.keyword("where")?;
    let predicate = parse_equality(&c.rest_raw()?)?;
    Ok(DbCommand::Delete { table, predicate })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db_types::Value;
    use crate::parser::{CompareOp, Condition};

    fn texts(line: &str) -> Vec<String> {
        tokenize(line).unwrap().into_iter().map(|t| t.text).collect()
    }

    fn command(line: &str) -> DbCommand {
        parse_command(line).unwrap().unwrap()
    }

    fn pred(column: &str, value: Value) -> Predicate {
        Predicate::from([(column.to_string(), value)])
    }

    #[test]
    fn tokenizer_groups_quoted_words() {
        assert_eq!(
            texts(r#"info  "my table" 'a b' c\ d "q\"x""#),
            vec!["info", "my table", "a b", "c d", "q\"x"]
        );
        let tokens = tokenize(r#"("John Doe", 3)"#).unwrap();
        assert_eq!(tokens[0].raw, r#"("John"#.to_string() + r#" Doe","#);
        assert_eq!(tokens[0].text, "(John Doe,");
    }

    #[test]
    fn tokenizer_rejects_unterminated_quotes() {
        assert!(matches!(tokenize("select 'oops"), Err(DbError::Format(_))));
        assert!(matches!(tokenize("select \"oops"), Err(DbError::Format(_))));
    }

    #[test]
    fn blank_lines_parse_to_nothing() {
        assert_eq!(parse_command("   ").unwrap(), None);
    }

    #[test]
    fn verbs_are_case_insensitive() {
        assert_eq!(command("EXIT"), DbCommand::Exit);
        assert_eq!(command("Help"), DbCommand::Help);
        assert_eq!(command("list_tables"), DbCommand::ListTables);
    }

    #[test]
    fn unknown_verb_is_reported() {
        assert!(matches!(
            parse_command("truncate users"),
            Err(DbError::UnknownCommand(ref v)) if v == "truncate"
        ));
    }

    #[test]
    fn create_table_needs_a_column() {
        assert_eq!(
            command("create_table users name:str age:int"),
            DbCommand::CreateTable {
                table: "users".into(),
                columns: vec!["name:str".into(), "age:int".into()],
            }
        );
        assert!(matches!(
            parse_command("create_table users"),
            Err(DbError::Usage(USAGE_CREATE_TABLE))
        ));
    }

    #[test]
    fn drop_and_info_take_exactly_one_table() {
        assert_eq!(
            command("drop_table users"),
            DbCommand::DropTable { table: "users".into() }
        );
        assert!(parse_command("drop_table").is_err());
        assert!(matches!(
            parse_command("info users extra"),
            Err(DbError::Usage(USAGE_INFO))
        ));
    }

    #[test]
    fn insert_keeps_quoted_commas_and_types() {
        assert_eq!(
            command(r#"insert into users values ("a,b", 3, true)"#),
            DbCommand::Insert {
                table: "users".into(),
                values: vec![Value::Text("a,b".into()), Value::Int(3), Value::Bool(true)],
            }
        );
        assert_eq!(
            command(r#"INSERT INTO users VALUES ("John Doe", "30")"#),
            DbCommand::Insert {
                table: "users".into(),
                values: vec![Value::Text("John Doe".into()), Value::Text("30".into())],
            }
        );
        assert_eq!(
            command("insert into t values (5)"),
            DbCommand::Insert {
                table: "t".into(),
                values: vec![Value::Int(5)],
            }
        );
    }

    #[test]
    fn insert_grammar_violations() {
        assert!(matches!(
            parse_command("insert users values (1)"),
            Err(DbError::Usage(USAGE_INSERT))
        ));
        assert!(matches!(
            parse_command("insert into users (1)"),
            Err(DbError::Usage(USAGE_INSERT))
        ));
        assert!(matches!(
            parse_command("insert into users values"),
            Err(DbError::Usage(USAGE_INSERT))
        ));
        assert!(matches!(
            parse_command("insert into users values 1, 2"),
            Err(DbError::Format(_))
        ));
    }

    #[test]
    fn select_with_and_without_where() {
        assert_eq!(
            command("select from users"),
            DbCommand::Select {
                table: "users".into(),
                condition: None,
            }
        );
        assert_eq!(
            command(r#"select from users where name = "Ann Lee""#),
            DbCommand::Select {
                table: "users".into(),
                condition: Some(Condition::Equals(pred(
                    "name",
                    Value::Text("Ann Lee".into())
                ))),
            }
        );
        assert_eq!(
            command("select from users where age>30"),
            DbCommand::Select {
                table: "users".into(),
                condition: Some(Condition::Compare {
                    column: "age".into(),
                    op: CompareOp::Gt,
                    value: Value::Int(30),
                }),
            }
        );
        assert!(parse_command("select users").is_err());
        assert!(parse_command("select from users where").is_err());
        assert!(parse_command("select from users limit 3").is_err());
    }

    #[test]
    fn update_splits_set_and_where() {
        assert_eq!(
            command(r#"update users set age = 31 where name = "Ann""#),
            DbCommand::Update {
                table: "users".into(),
                assignments: pred("age", Value::Int(31)),
                predicate: pred("name", Value::Text("Ann".into())),
            }
        );
        assert_eq!(
            command(r#"update users set note = "go where" where ID = 2"#),
            DbCommand::Update {
                table: "users".into(),
                assignments: pred("note", Value::Text("go where".into())),
                predicate: pred("ID", Value::Int(2)),
            }
        );
        assert!(matches!(
            parse_command("update users set age = 31"),
            Err(DbError::Usage(USAGE_UPDATE))
        ));
        assert!(matches!(
            parse_command("update users set where ID = 1"),
            Err(DbError::Usage(USAGE_UPDATE))
        ));
        assert!(matches!(
            parse_command("update users set age 31 where ID = 1"),
            Err(DbError::Format(_))
        ));
    }

    #[test]
    fn delete_with_where_or_truncate() {
        assert_eq!(
            command("delete from users where age = 31"),
            DbCommand::Delete {
                table: "users".into(),
                predicate: pred("age", Value::Int(31)),
            }
        );
        assert_eq!(
            command("delete from users"),
            DbCommand::Delete {
                table: "users".into(),
                predicate: Predicate::new(),
            }
        );
        assert!(matches!(
            parse_command("delete users where ID = 1"),
            Err(DbError::Usage(USAGE_DELETE))
        ));
    }
}
