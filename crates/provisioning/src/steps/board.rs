//! Board discovery and layout.
//!
//! Card fields are merged into the current document; columns and
//! swimlanes are rebuilt around the entries the remote owns.

use devhub_azdo::client::{BoardDocument, Scope, SettingsTarget};
use devhub_core::board::{
    card_rule_settings, merge_card_fields, replace_columns, replace_swimlanes, select_main_board,
};
use devhub_core::policy::StepId;
use devhub_core::types::{RemoteResourceRef, ResourceKind, StepOutcome};
use serde_json::Value;

use super::{items, Context};
use crate::error::StepFailure;

/// The board every layout step writes to.
pub(crate) struct BoardRef<'a> {
    pub team: &'a RemoteResourceRef,
    pub name: String,
}

impl BoardRef<'_> {
    fn target(&self, ctx: &Context<'_>, document: BoardDocument) -> SettingsTarget {
        SettingsTarget::board(ctx.project_name(), &self.team.id, &self.name, document)
    }
}

/// Pick the team's main board. `Ok(None)` when the team has no boards.
pub(crate) async fn discover_board<'a>(
    ctx: &Context<'_>,
    team: &'a RemoteResourceRef,
) -> Result<Option<BoardRef<'a>>, StepFailure> {
    let scope = Scope::team(ctx.project_name(), &team.id);
    let boards = ctx.client.list(ResourceKind::Board, &scope).await?;
    let name = select_main_board(boards.iter().map(|b| b.name.as_str())).map(str::to_string);

    if let Some(name) = &name {
        tracing::info!(team = %team.name, board = %name, "Selected board");
    }
    Ok(name.map(|name| BoardRef { team, name }))
}

/// Add the display fields to user story and bug cards.
pub(crate) async fn configure_cards(ctx: &Context<'_>, board: &BoardRef<'_>) -> Result<StepOutcome, StepFailure> {
    let target = board.target(ctx, BoardDocument::Cards);
    let current = ctx.client.get_settings(&target).await?;
    let merged = merge_card_fields(current)?;
    ctx.client.patch_settings(&target, &merged).await?;
    Ok(StepOutcome::configured(StepId::ConfigureBoardCards.name(), &board.name))
}

/// Priority fill colors and tag colors.
pub(crate) async fn configure_styles(ctx: &Context<'_>, board: &BoardRef<'_>) -> Result<StepOutcome, StepFailure> {
    let target = board.target(ctx, BoardDocument::CardRules);
    ctx.client
        .patch_settings(&target, &card_rule_settings())
        .await?;
    Ok(StepOutcome::configured(StepId::ConfigureBoardStyles.name(), &board.name))
}

pub(crate) async fn configure_columns(ctx: &Context<'_>, board: &BoardRef<'_>) -> Result<StepOutcome, StepFailure> {
    let target = board.target(ctx, BoardDocument::Columns);
    let current = ctx.client.get_settings(&target).await?;
    let columns = replace_columns(items(&current))?;
    ctx.client
        .patch_settings(&target, &Value::Array(columns))
        .await?;
    Ok(StepOutcome::configured(StepId::ConfigureBoardColumns.name(), &board.name))
}

pub(crate) async fn configure_swimlanes(ctx: &Context<'_>, board: &BoardRef<'_>) -> Result<StepOutcome, StepFailure> {
    let target = board.target(ctx, BoardDocument::Rows);
    let current = ctx.client.get_settings(&target).await?;
    let rows = replace_swimlanes(items(&current))?;
    ctx.client.patch_settings(&target, &Value::Array(rows)).await?;
    Ok(StepOutcome::configured(StepId::ConfigureBoardSwimlanes.name(), &board.name))
}
