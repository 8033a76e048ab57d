//! Built-in source list
//!
//! Yearly meeting summary archives, oldest first. Later years win where
//! records overlap.

pub const DEFAULT_SOURCES: [&str; 4] = [
    "https://raw.githubusercontent.com/SingularityNET-Archive/SingularityNET-Archive/main/Data/Snet-Ambassador-Program/Meeting-Summaries/2022/meeting-summaries-array.json",
    "https://raw.githubusercontent.com/SingularityNET-Archive/SingularityNET-Archive/main/Data/Snet-Ambassador-Program/Meeting-Summaries/2023/meeting-summaries-array.json",
    "https://raw.githubusercontent.com/SingularityNET-Archive/SingularityNET-Archive/main/Data/Snet-Ambassador-Program/Meeting-Summaries/2024/meeting-summaries-array.json",
    "https://raw.githubusercontent.com/SingularityNET-Archive/SingularityNET-Archive/main/Data/Snet-Ambassador-Program/Meeting-Summaries/2025/meeting-summaries-array.json",
];
