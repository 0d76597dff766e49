//! `kyoryoku roles`: list the built-in role catalog.

use kyoryoku_core::RoleCatalog;

pub fn run() {
    let catalog = RoleCatalog::builtin();
    println!("🦀 Kyoryoku Roles ({}, default {})", catalog.len(), catalog.default_role());
    println!("================");
    for profile in catalog.iter() {
        println!("  {:<22} {}", profile.name, profile.display_name);
        if !profile.description.is_empty() {
            println!("  {:<22} {}", "", profile.description);
        }
    }
}
