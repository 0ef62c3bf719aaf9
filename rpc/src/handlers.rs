//! Request handlers and their wire types.

use crate::error::RpcError;
use crate::pagination::{EventQuery, PageCursor};
use crate::server::RpcState;
use axum::extract::{Path, Query, State};
use axum::Json;
use fundrelay_campaign::{BackerContribution, CampaignDetail, CampaignSummary, MilestoneView};
use fundrelay_chain::Receipt;
use fundrelay_ledger::{Contribution, LoggedEvent};
use fundrelay_registry::CampaignDraft;
use fundrelay_types::{Address, Amount};
use serde::{Deserialize, Serialize};

// ── Requests ─────────────────────────────────────────────────────────────

/// Any call that only needs the caller's identity.
#[derive(Debug, Deserialize)]
pub struct CallerRequest {
    pub from: Address,
}

#[derive(Debug, Deserialize)]
pub struct CreateCampaignRequest {
    pub from: Address,
    #[serde(flatten)]
    pub draft: CampaignDraft,
}

#[derive(Debug, Deserialize)]
pub struct ContributeRequest {
    pub from: Address,
    pub amount: Amount,
}

#[derive(Debug, Deserialize)]
pub struct FaucetRequest {
    pub amount: Amount,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProviderRequest {
    pub from: Address,
    pub provider: Address,
}

#[derive(Debug, Deserialize)]
pub struct AdminRequest {
    pub from: Address,
    pub admin: Option<Address>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmissionRequest {
    pub from: Address,
    pub campaign: Address,
    pub milestone_index: usize,
    pub verified: bool,
}

// ── Responses ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub campaigns: usize,
    pub events: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub address: Address,
    pub receipt: Receipt,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WithdrawResponse {
    pub amount: Amount,
    pub receipt: Receipt,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProviderChangeResponse {
    pub changed: bool,
    pub receipt: Receipt,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmissionResponse {
    /// False when the milestone was already verified and nothing changed.
    pub recorded: bool,
    pub receipt: Receipt,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProvidersResponse {
    pub authority: Address,
    pub owner: Address,
    pub admin: Option<Address>,
    pub providers: Vec<Address>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub account: Address,
    pub balance: Amount,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EventPage {
    pub events: Vec<LoggedEvent>,
    #[serde(flatten)]
    pub cursor: PageCursor,
}

fn parse_address(raw: &str) -> Result<Address, RpcError> {
    Ok(raw.parse()?)
}

// ── Reads ────────────────────────────────────────────────────────────────

pub async fn healthcheck(State(state): State<RpcState>) -> Json<HealthResponse> {
    let (campaigns, events) = state
        .chain
        .read(|c| (c.registry().len(), c.events().next_sequence()))
        .await;
    Json(HealthResponse {
        status: "ok".into(),
        campaigns,
        events,
    })
}

pub async fn list_campaigns(State(state): State<RpcState>) -> Json<Vec<Address>> {
    Json(state.chain.read(|c| c.registry().list_campaigns()).await)
}

pub async fn campaign_summaries(State(state): State<RpcState>) -> Json<Vec<CampaignSummary>> {
    Json(state.chain.read(|c| c.registry().campaign_summaries()).await)
}

pub async fn campaign_detail(
    State(state): State<RpcState>,
    Path(campaign): Path<String>,
) -> Result<Json<CampaignDetail>, RpcError> {
    let campaign = parse_address(&campaign)?;
    let detail = state
        .chain
        .read(|c| c.registry().campaign_detail(&campaign))
        .await?;
    Ok(Json(detail))
}

pub async fn campaign_summary(
    State(state): State<RpcState>,
    Path(campaign): Path<String>,
) -> Result<Json<CampaignSummary>, RpcError> {
    let campaign = parse_address(&campaign)?;
    let summary = state
        .chain
        .read(|c| c.registry().campaign_summary(&campaign))
        .await?;
    Ok(Json(summary))
}

pub async fn campaign_milestones(
    State(state): State<RpcState>,
    Path(campaign): Path<String>,
) -> Result<Json<Vec<MilestoneView>>, RpcError> {
    let campaign = parse_address(&campaign)?;
    let milestones = state
        .chain
        .read(|c| {
            c.registry()
                .campaign(&campaign)
                .map(|record| MilestoneView::all(record, c.params()))
        })
        .await?;
    Ok(Json(milestones))
}

pub async fn campaign_contributions(
    State(state): State<RpcState>,
    Path(campaign): Path<String>,
) -> Result<Json<Vec<Contribution>>, RpcError> {
    let campaign = parse_address(&campaign)?;
    let contributions = state
        .chain
        .read(|c| {
            c.registry()
                .campaign(&campaign)
                .map(|record| record.contributions.clone())
        })
        .await?;
    Ok(Json(contributions))
}

pub async fn backer_contributions(
    State(state): State<RpcState>,
    Path(backer): Path<String>,
) -> Result<Json<Vec<BackerContribution>>, RpcError> {
    let backer = parse_address(&backer)?;
    Ok(Json(
        state
            .chain
            .read(|c| c.registry().contributions_by_backer(&backer))
            .await,
    ))
}

pub async fn balance(
    State(state): State<RpcState>,
    Path(account): Path<String>,
) -> Result<Json<BalanceResponse>, RpcError> {
    let account = parse_address(&account)?;
    let balance = state.chain.read(|c| c.balance_of(&account)).await;
    Ok(Json(BalanceResponse { account, balance }))
}

pub async fn providers(State(state): State<RpcState>) -> Json<ProvidersResponse> {
    Json(
        state
            .chain
            .read(|c| {
                let authority = c.authority();
                ProvidersResponse {
                    authority: authority.address(),
                    owner: authority.owner(),
                    admin: authority.admin(),
                    providers: authority.providers().copied().collect(),
                }
            })
            .await,
    )
}

pub async fn events(
    State(state): State<RpcState>,
    Query(query): Query<EventQuery>,
) -> Json<EventPage> {
    let start = query.start();
    let limit = query.effective_limit();
    let (events, len) = state
        .chain
        .read(|c| (c.events().range(start, limit).to_vec(), c.events().next_sequence()))
        .await;
    let cursor = PageCursor::after(start, events.len(), len);
    Json(EventPage { events, cursor })
}

pub async fn metrics(State(state): State<RpcState>) -> Result<String, RpcError> {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let mut buf = Vec::new();
    encoder
        .encode(&state.metrics.gather(), &mut buf)
        .map_err(|e| RpcError::Server(e.to_string()))?;
    String::from_utf8(buf).map_err(|e| RpcError::Server(e.to_string()))
}

// ── Transactions ─────────────────────────────────────────────────────────

pub async fn create_campaign(
    State(state): State<RpcState>,
    Json(req): Json<CreateCampaignRequest>,
) -> Result<Json<CreatedResponse>, RpcError> {
    let (address, receipt) = state
        .chain
        .transact(|c| c.create_campaign(req.from, req.draft))
        .await?;
    Ok(Json(CreatedResponse { address, receipt }))
}

pub async fn contribute(
    State(state): State<RpcState>,
    Path(campaign): Path<String>,
    Json(req): Json<ContributeRequest>,
) -> Result<Json<Receipt>, RpcError> {
    let campaign = parse_address(&campaign)?;
    let ((), receipt) = state
        .chain
        .transact(|c| c.contribute(req.from, &campaign, req.amount).map(|r| ((), r)))
        .await?;
    Ok(Json(receipt))
}

pub async fn request_verification(
    State(state): State<RpcState>,
    Path((campaign, index)): Path<(String, usize)>,
    Json(req): Json<CallerRequest>,
) -> Result<Json<Receipt>, RpcError> {
    let campaign = parse_address(&campaign)?;
    let ((), receipt) = state
        .chain
        .transact(|c| {
            c.request_verification(req.from, &campaign, index)
                .map(|r| ((), r))
        })
        .await?;
    Ok(Json(receipt))
}

pub async fn withdraw(
    State(state): State<RpcState>,
    Path((campaign, index)): Path<(String, usize)>,
    Json(req): Json<CallerRequest>,
) -> Result<Json<WithdrawResponse>, RpcError> {
    let campaign = parse_address(&campaign)?;
    let (amount, receipt) = state
        .chain
        .transact(|c| c.withdraw(req.from, &campaign, index))
        .await?;
    Ok(Json(WithdrawResponse { amount, receipt }))
}

pub async fn faucet(
    State(state): State<RpcState>,
    Path(account): Path<String>,
    Json(req): Json<FaucetRequest>,
) -> Result<Json<BalanceResponse>, RpcError> {
    if !state.enable_faucet {
        return Err(RpcError::FaucetDisabled);
    }
    let account = parse_address(&account)?;
    let balance = state
        .chain
        .update(|c| c.deposit(account, req.amount))
        .await?;
    Ok(Json(BalanceResponse { account, balance }))
}

pub async fn add_provider(
    State(state): State<RpcState>,
    Json(req): Json<ProviderRequest>,
) -> Result<Json<ProviderChangeResponse>, RpcError> {
    let (changed, receipt) = state
        .chain
        .transact(|c| c.add_provider(req.from, req.provider))
        .await?;
    Ok(Json(ProviderChangeResponse { changed, receipt }))
}

pub async fn remove_provider(
    State(state): State<RpcState>,
    Json(req): Json<ProviderRequest>,
) -> Result<Json<ProviderChangeResponse>, RpcError> {
    let (changed, receipt) = state
        .chain
        .transact(|c| c.remove_provider(req.from, req.provider))
        .await?;
    Ok(Json(ProviderChangeResponse { changed, receipt }))
}

pub async fn set_admin(
    State(state): State<RpcState>,
    Json(req): Json<AdminRequest>,
) -> Result<Json<ProvidersResponse>, RpcError> {
    state
        .chain
        .update(|c| c.set_authority_admin(req.from, req.admin))
        .await?;
    Ok(providers(State(state)).await)
}

pub async fn submit_verification(
    State(state): State<RpcState>,
    Json(req): Json<SubmissionRequest>,
) -> Result<Json<SubmissionResponse>, RpcError> {
    let (outcome, receipt) = state
        .chain
        .transact(|c| {
            c.submit_verification(req.from, &req.campaign, req.milestone_index, req.verified)
        })
        .await?;
    Ok(Json(SubmissionResponse {
        recorded: outcome.changed_state(),
        receipt,
    }))
}
