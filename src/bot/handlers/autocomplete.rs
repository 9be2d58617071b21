//! Autocomplete handlers for Discord slash command parameters.
//!
//! Suggestions respect the signed-in operator's scope: a reseller only sees their own
//! customers, and nothing is suggested before `/login`.

use crate::{
    bot::{BotData, current_actor},
    core::{customer, package, user},
    errors::Error,
};

/// Discord autocomplete limit
const MAX_SUGGESTIONS: usize = 25;

fn matching_names(names: impl IntoIterator<Item = String>, partial: &str) -> Vec<String> {
    let partial_lower = partial.to_lowercase();
    let mut matching: Vec<String> = names
        .into_iter()
        .filter(|name| name.to_lowercase().contains(&partial_lower))
        .collect();
    matching.sort();
    matching.truncate(MAX_SUGGESTIONS);
    matching
}

/// Suggests usernames of customers the operator can see.
pub async fn autocomplete_customer_username(
    ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    let Ok(actor) = current_actor(ctx).await else {
        return Vec::new();
    };
    let Ok(customers) = customer::get_all_customers(&ctx.data().database, &actor).await else {
        return Vec::new();
    };

    matching_names(customers.into_iter().map(|c| c.username), partial)
}

/// Suggests package names from the catalog.
pub async fn autocomplete_package_name(
    ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    let Ok(packages) = package::get_all_packages(&ctx.data().database).await else {
        return Vec::new();
    };

    matching_names(packages.into_iter().map(|p| p.name), partial)
}

/// Suggests operator usernames. Only offered to signed-in operators.
pub async fn autocomplete_operator_username(
    ctx: poise::Context<'_, BotData, Error>,
    partial: &str,
) -> Vec<String> {
    if current_actor(ctx).await.is_err() {
        return Vec::new();
    }
    let Ok(users) = user::get_all_users(&ctx.data().database).await else {
        return Vec::new();
    };

    matching_names(users.into_iter().map(|u| u.username), partial)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_names_filters_and_sorts() {
        let names = ["carol", "Alice", "bob", "alina"].map(String::from);
        assert_eq!(matching_names(names, "AL"), vec!["Alice", "alina"]);
    }

    #[test]
    fn test_matching_names_caps_suggestions() {
        let names = (0..40).map(|i| format!("user{i:02}"));
        let matching = matching_names(names, "user");
        assert_eq!(matching.len(), MAX_SUGGESTIONS);
        assert_eq!(matching[0], "user00");
    }
}
