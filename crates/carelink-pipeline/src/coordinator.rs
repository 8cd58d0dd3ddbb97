//! 报告摄取协调器
//!
//! 协调上传校验、报告落库、推理触发、结果合并与通知分发。
//! 每次调用无状态，全部上下文来自请求和存储。

use carelink_core::models::{
    NewReport, NewSuggestion, NotificationKind, Priority, Report, ReviewStatus, Role,
};
use carelink_core::store::{ReportStore, SuggestionStore};
use carelink_core::{CarelinkError, Result};
use carelink_inference::client::{normalize_scan_kind, InferenceService};
use carelink_inference::prediction::{Prediction, RawPrediction};
use carelink_notify::NotificationService;
use carelink_storage::staging::StagingArea;
use carelink_storage::storage::ObjectStore;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

/// 摄取策略
///
/// Strict: 元数据落库失败则整体失败。
/// Tolerant: 文件本体优先，落库失败仍视为上传成功。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IngestPolicy {
    #[default]
    Strict,
    Tolerant,
}

/// 上传摄取请求
#[derive(Debug, Clone, Deserialize)]
pub struct UploadRequest {
    pub patient_id: String,
    pub test_type: String,
    pub original_name: String,
    pub file_key: String,
    pub uploaded_by: String,
    pub priority: Option<Priority>,
    pub notes: Option<String>,
    pub patient_info: Option<Value>,
}

/// 摄取结果
#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    pub report_id: Option<Uuid>,
    pub recorded: bool,
    pub message: String,
}

/// 推理触发请求，报告行是权威数据源，其余字段仅作覆盖
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyzeRequest {
    pub report_id: Option<Uuid>,
    pub file_key: Option<String>,
    pub original_name: Option<String>,
    pub patient_id: Option<String>,
    pub test_type: Option<String>,
}

/// 推理流水线结果，prediction四个字段始终填满
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub report_id: Uuid,
    pub suggestion_id: Uuid,
    pub prediction: Prediction,
}

/// 推理流水线失败阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStage {
    Validate,
    FetchArtifact,
    UpdateReport,
    RecordSuggestion,
}

/// 推理流水线失败
///
/// 标记失败阶段；报告结果已回写后的失败仍携带已计算的预测，
/// 调用方可以区分"报告已更新但建议未落库"与更早的失败。
#[derive(Debug, Error)]
#[error("analysis failed at {stage:?}: {error}")]
pub struct AnalysisFailure {
    pub stage: AnalysisStage,
    #[source]
    pub error: CarelinkError,
    pub prediction: Option<Prediction>,
}

impl AnalysisFailure {
    fn at(stage: AnalysisStage, error: CarelinkError) -> Self {
        Self {
            stage,
            error,
            prediction: None,
        }
    }
}

/// 报告摄取协调器
///
/// 所有外部依赖显式注入，测试中可整体替换。
pub struct ReportCoordinator {
    reports: Arc<dyn ReportStore>,
    suggestions: Arc<dyn SuggestionStore>,
    objects: Arc<dyn ObjectStore>,
    inference: Arc<dyn InferenceService>,
    notifier: NotificationService,
    staging: StagingArea,
    policy: IngestPolicy,
}

impl ReportCoordinator {
    pub fn new(
        reports: Arc<dyn ReportStore>,
        suggestions: Arc<dyn SuggestionStore>,
        objects: Arc<dyn ObjectStore>,
        inference: Arc<dyn InferenceService>,
        notifier: NotificationService,
        staging: StagingArea,
        policy: IngestPolicy,
    ) -> Self {
        Self {
            reports,
            suggestions,
            objects,
            inference,
            notifier,
            staging,
            policy,
        }
    }

    /// 摄取一次上传：校验、落库、尽力而为地通知医生
    pub async fn ingest_upload(&self, request: UploadRequest) -> Result<IngestOutcome> {
        // 校验先于任何存储写入
        Self::validate_upload(&request)?;

        let new_report = NewReport {
            id: Uuid::new_v4(),
            patient_id: request.patient_id.clone(),
            test_type: request.test_type.clone(),
            original_name: request.original_name.clone(),
            file_key: request.file_key.clone(),
            priority: request.priority.unwrap_or_default(),
            notes: request.notes.clone().unwrap_or_default(),
            uploaded_by: request.uploaded_by.clone(),
            patient_info: request.patient_info.clone().unwrap_or_else(|| json!({})),
        };
        let priority = new_report.priority;

        let report_id = match self.reports.insert(&new_report).await {
            Ok(id) => id,
            Err(e) => {
                return match self.policy {
                    IngestPolicy::Strict => Err(e),
                    IngestPolicy::Tolerant => {
                        // 文件本体已在对象存储中，元数据缺失可以事后补录
                        warn!("Report insert failed, file kept without record: {}", e);
                        Ok(IngestOutcome {
                            report_id: None,
                            recorded: false,
                            message: "file stored without database record".to_string(),
                        })
                    }
                };
            }
        };

        info!(
            "Report {} ingested for patient {} ({})",
            report_id, request.patient_id, request.test_type
        );

        // 通知失败不影响摄取结果
        self.notifier
            .create_best_effort(
                NotificationKind::NewReport,
                "New report uploaded",
                &format!(
                    "{} report uploaded for patient {}",
                    request.test_type, request.patient_id
                ),
                Role::Doctor,
                json!({
                    "report_id": report_id,
                    "patient_id": request.patient_id,
                    "test_type": request.test_type,
                    "priority": priority.as_str(),
                }),
            )
            .await;

        Ok(IngestOutcome {
            report_id: Some(report_id),
            recorded: true,
            message: "report stored with database record".to_string(),
        })
    }

    /// 对一份报告执行推理并合并结果
    ///
    /// 推理服务本身的失败永远不会让本操作失败，只会换成兜底结果；
    /// 文件缺失和存储写入失败才是硬错误。
    pub async fn run_inference(
        &self,
        request: AnalyzeRequest,
    ) -> std::result::Result<AnalysisOutcome, AnalysisFailure> {
        let report_id = request.report_id.ok_or_else(|| {
            AnalysisFailure::at(
                AnalysisStage::Validate,
                CarelinkError::Validation("missing required field: report_id".to_string()),
            )
        })?;

        let report = self
            .reports
            .get(report_id)
            .await
            .map_err(|e| AnalysisFailure::at(AnalysisStage::Validate, e))?
            .ok_or_else(|| {
                AnalysisFailure::at(
                    AnalysisStage::Validate,
                    CarelinkError::NotFound(format!("report {} not found", report_id)),
                )
            })?;

        let file_key = request.file_key.unwrap_or_else(|| report.file_key.clone());
        let original_name = request
            .original_name
            .unwrap_or_else(|| report.original_name.clone());
        let patient_id = request
            .patient_id
            .unwrap_or_else(|| report.patient_id.clone());
        let test_type = request.test_type.unwrap_or_else(|| report.test_type.clone());

        // 1. 拉取原始文件，失败或为空则整体失败
        let image = self
            .objects
            .download(&file_key)
            .await
            .map_err(|e| AnalysisFailure::at(AnalysisStage::FetchArtifact, e))?;
        if image.is_empty() {
            return Err(AnalysisFailure::at(
                AnalysisStage::FetchArtifact,
                CarelinkError::Storage(format!("object is empty: {}", file_key)),
            ));
        }

        // 2. 落一份本次调用独占的暂存副本
        let staged = match self.staging.stage(&original_name, &image).await {
            Ok(staged) => Some(staged),
            Err(e) => {
                warn!("Staging failed, continuing with in-memory copy: {}", e);
                None
            }
        };

        // 3. 调用推理服务，任何失败替换为兜底结果
        let scan_kind = normalize_scan_kind(&test_type);
        let raw = match self
            .inference
            .analyze(&scan_kind, &original_name, image)
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Inference unavailable for report {}: {}", report_id, e);
                RawPrediction::from(Prediction::unavailable())
            }
        };

        // 4. 逐字段归一化，无论上一步是否兜底都执行
        let prediction = Prediction::from_raw(raw);

        // 5. 回写报告结果，再落建议记录
        let persisted = self
            .persist_prediction(&report, &patient_id, &test_type, &prediction)
            .await;

        if let Ok(suggestion_id) = &persisted {
            // 6. 尽力而为的通知
            self.notifier
                .create_best_effort(
                    NotificationKind::MlSuggestion,
                    "AI analysis completed",
                    &format!(
                        "AI suggestion ready for patient {} ({})",
                        patient_id, test_type
                    ),
                    Role::Doctor,
                    json!({
                        "suggestion_id": suggestion_id,
                        "report_id": report_id,
                        "patient_id": patient_id,
                        "test_type": test_type,
                        "confidence": prediction.confidence,
                        "severity": prediction.severity,
                    }),
                )
                .await;
        }

        // 7. 清理暂存副本，失败忽略
        if let Some(staged) = staged {
            staged.cleanup().await;
        }

        let suggestion_id = persisted?;
        info!(
            "Inference completed for report {}: severity {}, confidence {}",
            report_id, prediction.severity, prediction.confidence
        );

        Ok(AnalysisOutcome {
            report_id,
            suggestion_id,
            prediction,
        })
    }

    /// 查找已有结果但缺失建议记录的报告，供对账清理使用
    pub async fn find_orphaned_results(&self) -> Result<Vec<Uuid>> {
        self.suggestions.find_orphaned_results().await
    }

    /// 结果回写与建议落库是两次独立写入，失败阶段各自标记
    async fn persist_prediction(
        &self,
        report: &Report,
        patient_id: &str,
        test_type: &str,
        prediction: &Prediction,
    ) -> std::result::Result<Uuid, AnalysisFailure> {
        self.reports
            .update_result(report.id, prediction.to_value(), Utc::now())
            .await
            .map_err(|e| AnalysisFailure {
                stage: AnalysisStage::UpdateReport,
                error: e,
                prediction: Some(prediction.clone()),
            })?;

        let new_suggestion = NewSuggestion {
            id: Uuid::new_v4(),
            report_id: report.id,
            patient_id: patient_id.to_string(),
            test_type: test_type.to_string(),
            findings: prediction.findings.clone(),
            confidence: prediction.confidence,
            recommendations: prediction.recommendations.clone(),
            severity: prediction.severity.clone(),
            review_status: ReviewStatus::PendingReview,
        };

        self.suggestions
            .insert(&new_suggestion)
            .await
            .map_err(|e| AnalysisFailure {
                stage: AnalysisStage::RecordSuggestion,
                error: e,
                prediction: Some(prediction.clone()),
            })
    }

    fn validate_upload(request: &UploadRequest) -> Result<()> {
        let mandatory = [
            ("patient_id", &request.patient_id),
            ("test_type", &request.test_type),
            ("original_name", &request.original_name),
            ("file_key", &request.file_key),
            ("uploaded_by", &request.uploaded_by),
        ];

        for (name, value) in mandatory {
            if value.trim().is_empty() {
                return Err(CarelinkError::Validation(format!(
                    "missing required field: {}",
                    name
                )));
            }
        }
        Ok(())
    }
}
