use std::error::Error as StdError;

use aws_sdk_dynamodb::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_dynamodb::operation::batch_write_item::BatchWriteItemError;
use aws_sdk_dynamodb::operation::scan::ScanError as SdkScanError;
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::operation::put_object::PutObjectError;

use super::convert::ConvertError;
use super::types::{
    ScanError, ScanErrorKind, StageError, StageErrorKind, WriteError, WriteErrorKind,
};

pub fn map_scan_error(err: SdkError<SdkScanError>) -> ScanError {
    match &err {
        SdkError::ServiceError(context) => classify_scan_service_error(context.err()),
        SdkError::TimeoutError(_) => ScanError::new(
            ScanErrorKind::Network,
            format!("scan request timed out: {}", render_error_chain(&err)),
        ),
        SdkError::DispatchFailure(_) => ScanError::new(
            ScanErrorKind::Network,
            format!("network failure dispatching scan: {}", render_error_chain(&err)),
        ),
        SdkError::ResponseError(_) => ScanError::new(
            ScanErrorKind::Network,
            format!("unreadable scan response: {}", render_error_chain(&err)),
        ),
        _ => ScanError::new(
            ScanErrorKind::Other,
            format!("unclassified scan failure: {}", render_error_chain(&err)),
        ),
    }
}

pub fn classify_scan_service_error(err: &SdkScanError) -> ScanError {
    if err.is_provisioned_throughput_exceeded_exception() || err.is_request_limit_exceeded() {
        return ScanError::new(
            ScanErrorKind::Throttled,
            format!("scan throttled by the source table: {}", render_error_chain(err)),
        );
    }
    if err.is_internal_server_error() {
        return ScanError::new(
            ScanErrorKind::StoreUnavailable,
            format!("source store internal error: {}", render_error_chain(err)),
        );
    }
    if err.is_resource_not_found_exception() {
        return ScanError::new(
            ScanErrorKind::TableMissing,
            format!("source table does not exist: {}", render_error_chain(err)),
        );
    }

    match err.code() {
        Some("ThrottlingException") => ScanError::new(
            ScanErrorKind::Throttled,
            format!("scan throttled: {}", render_error_chain(err)),
        ),
        Some("ServiceUnavailable") => ScanError::new(
            ScanErrorKind::StoreUnavailable,
            format!("source store unavailable: {}", render_error_chain(err)),
        ),
        _ => ScanError::new(
            ScanErrorKind::Other,
            format!("scan rejected by the source store: {}", render_error_chain(err)),
        ),
    }
}

pub fn map_batch_write_error(err: SdkError<BatchWriteItemError>) -> WriteError {
    match &err {
        SdkError::ServiceError(context) => classify_batch_write_service_error(context.err()),
        SdkError::TimeoutError(_) => WriteError::new(
            WriteErrorKind::Network,
            format!("batch write timed out: {}", render_error_chain(&err)),
        ),
        SdkError::DispatchFailure(_) => WriteError::new(
            WriteErrorKind::Network,
            format!(
                "network failure dispatching batch write: {}",
                render_error_chain(&err)
            ),
        ),
        SdkError::ResponseError(_) => WriteError::new(
            WriteErrorKind::Network,
            format!("unreadable batch write response: {}", render_error_chain(&err)),
        ),
        _ => WriteError::new(
            WriteErrorKind::Other,
            format!("unclassified batch write failure: {}", render_error_chain(&err)),
        ),
    }
}

pub fn classify_batch_write_service_error(err: &BatchWriteItemError) -> WriteError {
    if err.is_provisioned_throughput_exceeded_exception() || err.is_request_limit_exceeded() {
        return WriteError::new(
            WriteErrorKind::Throttled,
            format!(
                "batch write throttled by the destination table: {}",
                render_error_chain(err)
            ),
        );
    }
    if err.is_internal_server_error() {
        return WriteError::new(
            WriteErrorKind::StoreUnavailable,
            format!("destination store internal error: {}", render_error_chain(err)),
        );
    }
    if err.is_resource_not_found_exception() {
        return WriteError::new(
            WriteErrorKind::TableMissing,
            format!("destination table does not exist: {}", render_error_chain(err)),
        );
    }

    match err.code() {
        Some("ThrottlingException") => WriteError::new(
            WriteErrorKind::Throttled,
            format!("batch write throttled: {}", render_error_chain(err)),
        ),
        _ => WriteError::new(
            WriteErrorKind::Other,
            format!(
                "batch write rejected by the destination store: {}",
                render_error_chain(err)
            ),
        ),
    }
}

pub fn map_put_object_error(err: SdkError<PutObjectError>, key: &str) -> StageError {
    match &err {
        SdkError::ServiceError(context) => {
            classify_stage_service_error(context.err().code(), context.err(), "store", key)
        }
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            StageError::new(
                StageErrorKind::Network,
                format!(
                    "network failure storing stage {key}: {}",
                    render_error_chain(&err)
                ),
            )
        }
        _ => StageError::new(
            StageErrorKind::Other,
            format!(
                "unclassified failure storing stage {key}: {}",
                render_error_chain(&err)
            ),
        ),
    }
}

pub fn map_get_object_error(err: SdkError<GetObjectError>, key: &str) -> StageError {
    match &err {
        SdkError::ServiceError(context) => {
            if context.err().is_no_such_key() {
                return StageError::new(
                    StageErrorKind::NotFound,
                    format!("staged blob {key} does not exist"),
                );
            }
            classify_stage_service_error(context.err().code(), context.err(), "fetch", key)
        }
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            StageError::new(
                StageErrorKind::Network,
                format!(
                    "network failure fetching stage {key}: {}",
                    render_error_chain(&err)
                ),
            )
        }
        _ => StageError::new(
            StageErrorKind::Other,
            format!(
                "unclassified failure fetching stage {key}: {}",
                render_error_chain(&err)
            ),
        ),
    }
}

fn classify_stage_service_error(
    code: Option<&str>,
    err: &(dyn StdError + 'static),
    verb: &str,
    key: &str,
) -> StageError {
    match code {
        Some("SlowDown") => StageError::new(
            StageErrorKind::Throttled,
            format!("staging bucket asked to slow down on {verb} of {key}"),
        ),
        Some("InternalError") | Some("ServiceUnavailable") | Some("RequestTimeout") => {
            StageError::new(
                StageErrorKind::Network,
                format!(
                    "transient staging-store failure on {verb} of {key}: {}",
                    render_error_chain(err)
                ),
            )
        }
        Some("NoSuchBucket") => StageError::new(
            StageErrorKind::NotFound,
            format!("staging bucket does not exist ({verb} of {key})"),
        ),
        Some("AccessDenied") | Some("InvalidAccessKeyId") | Some("SignatureDoesNotMatch") => {
            StageError::new(
                StageErrorKind::AccessDenied,
                format!("access denied on {verb} of {key}"),
            )
        }
        _ => StageError::new(
            StageErrorKind::Other,
            format!(
                "staging store rejected {verb} of {key}: {}",
                render_error_chain(err)
            ),
        ),
    }
}

pub fn map_scan_convert_error(err: ConvertError) -> ScanError {
    ScanError::new(
        ScanErrorKind::MalformedItem,
        format!("scanned item cannot be represented on the wire: {err}"),
    )
}

pub fn map_write_convert_error(err: ConvertError) -> WriteError {
    WriteError::new(
        WriteErrorKind::MalformedItem,
        format!("staged item cannot be converted for the destination store: {err}"),
    )
}

fn render_error_chain(error: &(dyn StdError + 'static)) -> String {
    let mut parts = vec![error.to_string()];
    let mut source = error.source();
    while let Some(next) = source {
        parts.push(next.to_string());
        source = next.source();
    }
    parts.join(" | caused_by: ")
}
