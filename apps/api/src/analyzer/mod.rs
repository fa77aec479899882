// Live analysis: upload handlers and the submission pipeline behind them.
// Scoring itself happens in the external API; see analysis_client.

pub mod handlers;
pub mod pipeline;
