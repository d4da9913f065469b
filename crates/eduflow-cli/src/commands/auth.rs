//! Login and password command handlers

use anyhow::Result;

use eduflow_core::Store;

use crate::output::Output;
use crate::prompt::value_or_prompt;

/// Check credentials and show who they belong to
pub fn login(store: &Store, id: String, password: Option<String>, output: &Output) -> Result<()> {
    let password = value_or_prompt(password, "Password")?;
    let user = store.authenticate(&id, &password)?;

    output.success(&format!("Logged in as {} ({})", user.name, user.role));
    if !output.is_json() {
        output.print_user(user)?;
    }
    Ok(())
}

/// Change a password after confirming the current one
pub fn passwd(
    store: &mut Store,
    id: String,
    current: Option<String>,
    new: Option<String>,
    output: &Output,
) -> Result<()> {
    let current = value_or_prompt(current, "Current password")?;
    store.authenticate(&id, &current)?;

    let new = value_or_prompt(new, "New password")?;
    store.change_password(&id, &new)?;

    output.success(&format!("Password changed for {}", id));
    Ok(())
}
