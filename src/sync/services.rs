pub mod reconciler;
pub mod report;

pub use {
    reconciler::reconcile,
    report::{
        build_report,
        render_table,
        write_csv_report,
    },
};
