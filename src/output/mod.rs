pub mod formatter;

pub use formatter::{
    format_advancement_table, format_completion_summary, format_points, format_points_table,
    format_standings_table, format_standings_tsv, format_time, should_use_colors,
    AdvancementRow, PointsRow,
};
