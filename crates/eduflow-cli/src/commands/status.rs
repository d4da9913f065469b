//! Status and reset command handlers

use anyhow::Result;

use eduflow_core::Store;

use crate::output::{Output, OutputFormat};
use crate::prompt::confirm;

/// Show dashboard counts and storage usage
pub fn show(store: &Store, output: &Output) -> Result<()> {
    let overview = store.overview();
    let stats = store.storage_stats()?;
    let config = store.config();

    match output.format {
        OutputFormat::Json => {
            output.json(&serde_json::json!({
                "counts": overview,
                "storage": {
                    "location": config.data_dir,
                    "collections": stats
                        .collections
                        .iter()
                        .map(|(key, size)| serde_json::json!({"key": key, "size": size}))
                        .collect::<Vec<_>>(),
                    "total_size": stats.total_size()
                },
                "freeze_window_days": config.freeze_window_days
            }))?;
        }
        OutputFormat::Quiet => {
            println!(
                "{} {} {} {}",
                overview.students, overview.staff, overview.departments, overview.subjects
            );
        }
        OutputFormat::Human => {
            println!("EduFlow Status");
            println!("==============");
            println!();
            println!("Contents:");
            println!("  Students:    {}", overview.students);
            println!("  Staff:       {}", overview.staff);
            println!("  Departments: {}", overview.departments);
            println!("  Subjects:    {}", overview.subjects);
            println!();
            println!("Attendance:");
            println!(
                "  Editable for {} day(s) either side of today ({})",
                config.freeze_window_days,
                store.today()
            );
            println!();
            println!("Storage:");
            println!("  Location: {}", config.data_dir.display());
            println!("  Size:     {}", stats.total_size_human());
        }
    }

    Ok(())
}

/// Wipe all data back to the seeded state
pub fn reset(store: &mut Store, yes: bool, output: &Output) -> Result<()> {
    if !yes {
        if !output.should_prompt() {
            anyhow::bail!("Refusing to reset without --yes");
        }
        println!("This deletes every student, staff member, timetable and record.");
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    store.reset()?;
    output.success("Data reset; log in as ADM001 / admin123");
    Ok(())
}
