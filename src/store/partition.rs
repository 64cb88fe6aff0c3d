use serde::{Deserialize, Serialize};

/// Named partition (logical table) of the local store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Partition {
    /// Daily stats for the signed-in user
    UserStats,
    /// Logged workouts
    Workouts,
    /// Planned and eaten meals
    Meals,
    /// Individual water intake logs
    Hydration,
    /// Pending, synced and failed remote mutations
    SyncQueue,
    /// TTL cache entries
    Cache,
}

impl Partition {
    /// Every partition, in the order they are cleared
    pub const ALL: [Partition; 6] = [
        Partition::UserStats,
        Partition::Workouts,
        Partition::Meals,
        Partition::Hydration,
        Partition::SyncQueue,
        Partition::Cache,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Partition::UserStats => "userStats",
            Partition::Workouts => "workouts",
            Partition::Meals => "meals",
            Partition::Hydration => "hydration",
            Partition::SyncQueue => "syncQueue",
            Partition::Cache => "cache",
        }
    }

    /// File name of the JSON document backing this partition
    pub fn file_name(&self) -> String {
        format!("{}.json", self.as_str())
    }
}

impl std::fmt::Display for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Partition {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        Partition::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("Unknown store partition: {s}"))
    }
}
