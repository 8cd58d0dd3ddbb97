//! HTTP处理器

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use carelink_core::models::Role;
use carelink_core::store::ReportStore;
use carelink_core::utils::is_sample_key;
use carelink_core::CarelinkError;
use carelink_notify::NotificationService;
use carelink_pipeline::{AnalysisFailure, AnalyzeRequest, ReportCoordinator, UploadRequest};
use carelink_storage::signing::UrlSigner;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// 应用共享状态
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<ReportCoordinator>,
    pub notifications: NotificationService,
    pub reports: Arc<dyn ReportStore>,
    pub signer: Arc<UrlSigner>,
    pub url_ttl_secs: i64,
}

/// 统一错误响应封装
pub struct ApiError(pub CarelinkError);

impl From<CarelinkError> for ApiError {
    fn from(error: CarelinkError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, category) = match &self.0 {
            CarelinkError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            CarelinkError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            CarelinkError::Configuration(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "configuration_error")
            }
            CarelinkError::Database(_) | CarelinkError::Storage(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "store_error")
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let body = Json(json!({
            "error": category,
            "details": self.0.to_string(),
        }));
        (status, body).into_response()
    }
}

/// API根路径处理器
pub async fn api_root() -> impl IntoResponse {
    Json(json!({
        "service": "Carelink Report API",
        "version": "1.0.0",
        "status": "running",
        "endpoints": {
            "health": "/health",
            "reports": "/api/v1/reports",
            "notifications": "/api/v1/notifications"
        }
    }))
}

/// 健康检查处理器
pub async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": "1.0.0"
    }))
}

/// 上传摄取处理器
pub async fn ingest_report(
    State(state): State<AppState>,
    Json(request): Json<UploadRequest>,
) -> Result<impl IntoResponse, ApiError> {
    info!(
        "Ingesting {} report for patient {}",
        request.test_type, request.patient_id
    );

    let outcome = state.coordinator.ingest_upload(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "report_id": outcome.report_id,
            "recorded": outcome.recorded,
            "message": outcome.message,
        })),
    ))
}

/// 推理触发处理器
pub async fn analyze_report(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    info!("Running inference for report {}", id);

    let request = AnalyzeRequest {
        report_id: Some(id),
        ..AnalyzeRequest::default()
    };

    match state.coordinator.run_inference(request).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(json!({
                "report_id": outcome.report_id,
                "suggestion_id": outcome.suggestion_id,
                "prediction": outcome.prediction,
            })),
        )
            .into_response(),
        Err(failure) => analysis_failure_response(failure),
    }
}

/// 推理失败响应：带失败阶段，已计算的预测不丢弃
fn analysis_failure_response(failure: AnalysisFailure) -> Response {
    let status = match &failure.error {
        CarelinkError::Validation(_) => StatusCode::BAD_REQUEST,
        CarelinkError::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let body = Json(json!({
        "error": "analysis_failed",
        "details": failure.error.to_string(),
        "stage": failure.stage,
        "prediction": failure.prediction,
    }));
    (status, body).into_response()
}

/// 报告列表查询参数
#[derive(Debug, Deserialize)]
pub struct ReportQueryParams {
    pub patient_id: Option<String>,
}

/// 报告列表处理器
pub async fn list_reports(
    State(state): State<AppState>,
    Query(params): Query<ReportQueryParams>,
) -> Result<impl IntoResponse, ApiError> {
    let patient_id = params.patient_id.ok_or_else(|| {
        CarelinkError::Validation("missing required query parameter: patient_id".to_string())
    })?;

    let reports = state.reports.list_by_patient(&patient_id).await?;
    let total = reports.len();
    Ok(Json(json!({
        "reports": reports,
        "total": total,
    })))
}

/// 单个报告查询处理器
pub async fn get_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state
        .reports
        .get(id)
        .await?
        .ok_or_else(|| CarelinkError::NotFound(format!("report {} not found", id)))?;
    Ok(Json(json!({ "report": report })))
}

/// 下载链接查询参数
#[derive(Debug, Deserialize)]
pub struct FileUrlParams {
    pub ttl_secs: Option<i64>,
}

/// 签名下载链接处理器
pub async fn report_file_url(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<FileUrlParams>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state
        .reports
        .get(id)
        .await?
        .ok_or_else(|| CarelinkError::NotFound(format!("report {} not found", id)))?;

    let ttl = params.ttl_secs.unwrap_or(state.url_ttl_secs);
    let url = state.signer.sign(&report.file_key, ttl)?;

    Ok(Json(json!({
        "url": url,
        "sample_data": is_sample_key(&report.file_key),
    })))
}

/// 对账查询处理器：列出已有结果但缺失建议记录的报告
pub async fn orphaned_results(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let orphans = state.coordinator.find_orphaned_results().await?;
    let total = orphans.len();
    Ok(Json(json!({
        "report_ids": orphans,
        "total": total,
    })))
}

/// 通知查询参数
#[derive(Debug, Deserialize)]
pub struct NotificationQueryParams {
    pub role: Role,
    pub limit: Option<i64>,
}

/// 通知列表处理器
pub async fn list_notifications(
    State(state): State<AppState>,
    Query(params): Query<NotificationQueryParams>,
) -> Result<impl IntoResponse, ApiError> {
    let notifications = state
        .notifications
        .list(params.role, params.limit.unwrap_or(50))
        .await?;
    let total = notifications.len();
    Ok(Json(json!({
        "notifications": notifications,
        "total": total,
    })))
}

/// 未读计数处理器
pub async fn unread_count(
    State(state): State<AppState>,
    Query(params): Query<NotificationQueryParams>,
) -> Result<impl IntoResponse, ApiError> {
    let count = state.notifications.unread_count(params.role).await?;
    Ok(Json(json!({ "unread": count })))
}

/// 单条通知已读处理器
pub async fn mark_notification_read(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.notifications.mark_read(id).await?;
    Ok(Json(json!({ "marked": true })))
}

/// 全部已读请求体
#[derive(Debug, Deserialize)]
pub struct MarkAllReadRequest {
    pub role: Role,
}

/// 全部已读处理器
pub async fn mark_all_notifications_read(
    State(state): State<AppState>,
    Json(request): Json<MarkAllReadRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let affected = state.notifications.mark_all_read(request.role).await?;
    Ok(Json(json!({ "marked": affected })))
}
