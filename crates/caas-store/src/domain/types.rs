use serde::{Deserialize, Serialize};

/// One observed attempt against the cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueryStat {
    pub statement: String,
    pub attempts: u32,
    #[serde(rename = "Time")]
    pub time_ms: f64,
    pub host: String,
    pub rows: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Counter {
    pub name: String,
    pub value: i64,
    /// Service instance that handled the request.
    pub host: String,
    #[serde(rename = "DBStats")]
    pub db_stats: Vec<QueryStat>,
}
