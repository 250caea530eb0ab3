use std::fmt;
use std::str::FromStr;

pub const COUNTER_TABLE: &str = "counter";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Consistency {
    Any,
    One,
    Two,
    Three,
    Quorum,
    All,
    LocalQuorum,
    EachQuorum,
    LocalOne,
}

impl fmt::Display for Consistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Consistency::Any => "any",
            Consistency::One => "one",
            Consistency::Two => "two",
            Consistency::Three => "three",
            Consistency::Quorum => "quorum",
            Consistency::All => "all",
            Consistency::LocalQuorum => "local_quorum",
            Consistency::EachQuorum => "each_quorum",
            Consistency::LocalOne => "local_one",
        };
        f.write_str(s)
    }
}

impl FromStr for Consistency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "any" => Ok(Consistency::Any),
            "one" => Ok(Consistency::One),
            "two" => Ok(Consistency::Two),
            "three" => Ok(Consistency::Three),
            "quorum" => Ok(Consistency::Quorum),
            "all" => Ok(Consistency::All),
            "local_quorum" => Ok(Consistency::LocalQuorum),
            "each_quorum" => Ok(Consistency::EachQuorum),
            "local_one" => Ok(Consistency::LocalOne),
            other => Err(format!("unknown consistency level {other:?}")),
        }
    }
}

/// The two statements the counter protocol issues per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CounterQuery {
    Increment,
    Read,
}

impl CounterQuery {
    pub const fn cql(self) -> &'static str {
        match self {
            CounterQuery::Increment => "UPDATE counter SET value = value + 1 WHERE name = ?",
            CounterQuery::Read => "SELECT name, value FROM counter WHERE name = ? LIMIT 1",
        }
    }
}

impl fmt::Display for CounterQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CounterQuery::Increment => f.write_str("increment"),
            CounterQuery::Read => f.write_str("read"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Statement<'a> {
    pub query: CounterQuery,
    pub name: &'a str,
    pub consistency: Consistency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaStatement<'a> {
    CreateKeyspace {
        keyspace: &'a str,
        replication_factor: u32,
    },
    CreateCounterTable,
}

impl SchemaStatement<'_> {
    pub fn cql(&self) -> String {
        match self {
            SchemaStatement::CreateKeyspace {
                keyspace,
                replication_factor,
            } => format!(
                "CREATE KEYSPACE IF NOT EXISTS {keyspace} \
                 WITH replication = {{'class': 'SimpleStrategy', 'replication_factor': {replication_factor}}}"
            ),
            SchemaStatement::CreateCounterTable => format!(
                "CREATE TABLE IF NOT EXISTS {COUNTER_TABLE} (\
                 name text, \
                 value counter, \
                 PRIMARY KEY (name)\
                )"
            ),
        }
    }

    pub const fn op(&self) -> &'static str {
        match self {
            SchemaStatement::CreateKeyspace { .. } => "create keyspace",
            SchemaStatement::CreateCounterTable => "create table",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterRow {
    pub name: String,
    pub value: i64,
}
