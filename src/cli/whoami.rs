use colored::Colorize;

use crate::error::Result;
use crate::permissions::{CapabilityMap, Module};
use crate::settings::load_settings;

pub fn run(map: &CapabilityMap, role_override: Option<&str>, check: Option<&str>) -> Result<()> {
    let settings = load_settings();
    let caller = super::caller(map, &settings, role_override);
    let permissions = &caller.permissions;

    if let Some(capability) = check {
        let role = permissions.role().name();
        if map.can(role, capability) {
            println!("{} {role} may {capability}", "✓".green());
        } else {
            println!("{} {role} may not {capability}", "✗".red());
        }
        return Ok(());
    }

    println!("User:          {}", caller.principal);
    println!("Profile role:  {}", role_override.unwrap_or(&settings.role));
    println!("Acting as:     {}", permissions.role().name());

    let modules: Vec<_> = permissions.visible_modules().iter().map(Module::key).collect();
    println!("Sections:      {}", modules.join(", "));

    let capabilities: Vec<_> = permissions.capabilities().map(|c| c.key()).collect();
    println!("Capabilities:  {}", capabilities.join(", "));
    Ok(())
}
