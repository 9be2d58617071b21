//! General Discord commands - ping and help.
//! These commands don't require a session or database operations.

// Inner module to suppress missing_docs warnings for poise macro-generated code
mod inner {
    #![allow(missing_docs)]

    use crate::{
        bot::BotData,
        errors::{Error, Result},
    };

    /// Responds with "Pong!" to test bot connectivity.
    #[poise::command(slash_command, prefix_command)]
    pub async fn ping(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        ctx.say("Pong!").await?;
        Ok(())
    }

    /// Displays help information about available commands.
    #[poise::command(slash_command, prefix_command)]
    pub async fn help(ctx: poise::Context<'_, BotData, Error>) -> Result<()> {
        let help_text = "**ISP Billing Help**\n\
        Sign in with `/login` first; every command runs with your account's permissions.\n\n\
        **Session**\n\
        • `/login <username> <password>` - Signs in to an operator account.\n\
        • `/logout` - Ends your session.\n\
        • `/whoami` - Shows your account and permissions.\n\n\
        **Customers**\n\
        • `/customers` - Lists customers.\n\
        • `/customer_info <customer>` - Shows one customer.\n\
        • `/customer_add ...` - Creates and provisions a customer.\n\
        • `/customer_edit <customer> ...` - Updates profile fields.\n\
        • `/recharge <customer> <amount>` - Adds to a customer's balance.\n\
        • `/customer_balance <customer> <balance>` - Sets a balance directly.\n\
        • `/history <customer>` - Shows balance ledger entries.\n\
        • `/customer_delete <customer>` - Removes a customer.\n\n\
        **Billing**\n\
        • `/dashboard` - Customer counts and revenue.\n\
        • `/alerts` - Customers about to run out of balance.\n\
        • `/sweep` - Runs the daily auto-deduction now.\n\
        • `/packages`, `/package_add` - Package catalog.\n\
        • `/message <customer> <subject> <body>`, `/inbox`, `/message_read`, `/message_delete` - Customer messages.\n\n\
        **Network**\n\
        • `/servers`, `/server_add`, `/server_edit`, `/server_delete`, `/server_check <id>` - Mikrotik routers.\n\
        • `/onu_check <customer>`, `/onu_status` - Fiber ONU readings.\n\n\
        **Administration**\n\
        • `/users`, `/user_add`, `/password_set` - Operator accounts.\n\
        • `/permission_set <employee> <permission> <enabled>` - Employee permissions.\n\
        • `/reseller_credit`, `/reseller_refund`, `/reseller_ledger` - Reseller credit.";

        ctx.say(help_text).await?;
        Ok(())
    }
}

// Re-export all commands
pub use inner::*;
