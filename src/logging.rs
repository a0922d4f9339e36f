// Macros file - tracing macros are imported within the macro definitions

/// Standardized logging macros for consistent field names and message patterns across the application
///
/// These macros ensure:
/// - Consistent field naming conventions
/// - Appropriate logging levels for different scenarios
/// - Structured logging with context

// ============================================================================
// API Operation Logging Macros
// ============================================================================

/// Log the start of an API operation with consistent fields
#[macro_export]
macro_rules! log_api_start {
    ($operation:expr, subject = $subject:expr) => {
        tracing::debug!(
            operation = $operation,
            subject = %$subject,
            "API operation started"
        );
    };
    ($operation:expr) => {
        tracing::debug!(
            operation = $operation,
            "API operation started"
        );
    };
}

/// Log successful completion of an API operation
#[macro_export]
macro_rules! log_api_success {
    ($operation:expr, subject = $subject:expr, count = $count:expr, $msg:expr) => {
        tracing::info!(
            operation = $operation,
            subject = %$subject,
            count = $count,
            "API operation completed: {}", $msg
        );
    };
    ($operation:expr, subject = $subject:expr, $msg:expr) => {
        tracing::info!(
            operation = $operation,
            subject = %$subject,
            "API operation completed: {}", $msg
        );
    };
    ($operation:expr, $msg:expr) => {
        tracing::info!(
            operation = $operation,
            "API operation completed: {}", $msg
        );
    };
}

/// Log API operation errors with consistent structure
#[macro_export]
macro_rules! log_api_error {
    ($operation:expr, subject = $subject:expr, error = $error:expr, $msg:expr) => {
        tracing::error!(
            operation = $operation,
            subject = %$subject,
            error = %$error,
            "API operation failed: {}", $msg
        );
    };
    ($operation:expr, error = $error:expr, $msg:expr) => {
        tracing::error!(
            operation = $operation,
            error = %$error,
            "API operation failed: {}", $msg
        );
    };
}

/// Log API warnings with context
#[macro_export]
macro_rules! log_api_warn {
    ($operation:expr, subject = $subject:expr, $msg:expr) => {
        tracing::warn!(
            operation = $operation,
            subject = %$subject,
            "API operation warning: {}", $msg
        );
    };
    ($operation:expr, $msg:expr) => {
        tracing::warn!(
            operation = $operation,
            "API operation warning: {}", $msg
        );
    };
}

// ============================================================================
// Service Layer Logging Macros
// ============================================================================

/// Log service operation start with context
#[macro_export]
macro_rules! log_service_start {
    ($service:expr, $operation:expr, subject = $subject:expr, count = $count:expr) => {
        tracing::info!(
            service = $service,
            operation = $operation,
            subject = %$subject,
            requested = $count,
            "Service operation started"
        );
    };
    ($service:expr, $operation:expr) => {
        tracing::info!(
            service = $service,
            operation = $operation,
            "Service operation started"
        );
    };
}

/// Log service operation success
#[macro_export]
macro_rules! log_service_success {
    ($service:expr, $operation:expr, subject = $subject:expr, count = $count:expr, duration_ms = $duration:expr) => {
        tracing::info!(
            service = $service,
            operation = $operation,
            subject = %$subject,
            count = $count,
            duration_ms = $duration,
            "Service operation completed successfully"
        );
    };
    ($service:expr, $operation:expr, $msg:expr) => {
        tracing::info!(
            service = $service,
            operation = $operation,
            "Service operation completed: {}", $msg
        );
    };
}

/// Log service warnings
#[macro_export]
macro_rules! log_service_warn {
    ($service:expr, $operation:expr, $msg:expr) => {
        tracing::warn!(
            service = $service,
            operation = $operation,
            "Service warning: {}",
            $msg
        );
    };
}

// ============================================================================
// Question Source Logging Macros
// ============================================================================

/// Log external question source calls
#[macro_export]
macro_rules! log_source_operation {
    (debug, $source:expr, subject = $subject:expr, count = $count:expr, duration_ms = $duration:expr) => {
        tracing::debug!(
            component = "question_source",
            source = $source,
            subject = %$subject,
            result_count = $count,
            duration_ms = $duration,
            "Question source fetch completed"
        );
    };
    (info, $source:expr, $msg:expr) => {
        tracing::info!(
            component = "question_source",
            source = $source,
            "Question source: {}", $msg
        );
    };
    (dropped, $source:expr, subject = $subject:expr, error = $error:expr) => {
        tracing::warn!(
            component = "question_source",
            source = $source,
            subject = %$subject,
            error = %$error,
            "Dropped malformed question record"
        );
    };
    (error, $source:expr, error = $error:expr) => {
        tracing::error!(
            component = "question_source",
            source = $source,
            error = %$error,
            "Question source fetch failed"
        );
    };
}

// ============================================================================
// Generator Logging Macros
// ============================================================================

/// Log generator outcomes
#[macro_export]
macro_rules! log_generation {
    (rejected, subject = $subject:expr, grade = $grade:expr, reason = $reason:expr) => {
        tracing::debug!(
            component = "generator",
            subject = %$subject,
            grade = %$grade,
            reason = %$reason,
            "Generated question rejected"
        );
    };
    (exhausted, subject = $subject:expr, attempts = $attempts:expr, shortfall = $shortfall:expr) => {
        tracing::warn!(
            component = "generator",
            subject = %$subject,
            attempts = $attempts,
            shortfall = $shortfall,
            "Attempt budget exhausted, padding with fallback questions"
        );
    };
    (fallback, subject = $subject:expr, error = $error:expr) => {
        tracing::warn!(
            component = "generator",
            subject = %$subject,
            error = %$error,
            "Generation failed, using fallback question"
        );
    };
}

// ============================================================================
// System Event Logging Macros
// ============================================================================

/// Log system startup and shutdown events
#[macro_export]
macro_rules! log_system_event {
    (startup, component = $component:expr, $msg:expr) => {
        tracing::info!(
            event_type = "startup",
            component = $component,
            "System event: {}",
            $msg
        );
    };
    (shutdown, component = $component:expr, $msg:expr) => {
        tracing::info!(
            event_type = "shutdown",
            component = $component,
            "System event: {}",
            $msg
        );
    };
    (config, $msg:expr) => {
        tracing::info!(event_type = "configuration", "System event: {}", $msg);
    };
}

// ============================================================================
// Performance Logging Macros
// ============================================================================

/// Log performance metrics with consistent structure
#[macro_export]
macro_rules! log_performance {
    ($operation:expr, duration_ms = $duration:expr, count = $count:expr) => {
        tracing::debug!(
            event_type = "performance",
            operation = $operation,
            duration_ms = $duration,
            item_count = $count,
            "Performance metrics"
        );
    };
    ($operation:expr, duration_ms = $duration:expr) => {
        tracing::debug!(
            event_type = "performance",
            operation = $operation,
            duration_ms = $duration,
            "Performance metrics"
        );
    };
}

// ============================================================================
// Validation Logging Macros
// ============================================================================

/// Log validation results consistently
#[macro_export]
macro_rules! log_validation {
    (success, $component:expr, $msg:expr) => {
        tracing::debug!(
            event_type = "validation",
            component = $component,
            result = "success",
            "Validation completed: {}", $msg
        );
    };
    (failure, $component:expr, error = $error:expr) => {
        tracing::warn!(
            event_type = "validation",
            component = $component,
            result = "failure",
            error = %$error,
            "Validation failed"
        );
    };
}

#[cfg(test)]
mod tests {
    use crate::errors::QuestionDefect;
    use crate::models::Subject;

    #[test]
    fn test_logging_macros_compile() {
        let subject = Subject::Math;
        let error = anyhow::anyhow!("test error");

        // Test that all macro variants compile successfully
        log_api_start!("get_batch", subject = subject);
        log_api_start!("health");

        log_api_success!("get_batch", subject = subject, count = 10, "batch built");
        log_api_success!("get_batch", subject = subject, "batch built");
        log_api_success!("health", "ok");

        log_api_error!("get_batch", subject = subject, error = error, "failed");
        log_api_warn!("get_batch", subject = subject, "slow source");

        log_service_start!("session_assembler", "build_batch", subject = subject, count = 10);
        log_service_success!(
            "session_assembler",
            "build_batch",
            subject = subject,
            count = 10,
            duration_ms = 3
        );
        log_service_warn!("session_assembler", "build_batch", "source unavailable");

        log_source_operation!(debug, "sqlite", subject = subject, count = 4, duration_ms = 2);
        log_source_operation!(info, "rest", "client created");
        log_source_operation!(dropped, "rest", subject = subject, error = QuestionDefect::EmptyHint);
        log_source_operation!(error, "rest", error = error);

        log_generation!(rejected, subject = subject, grade = 3, reason = "duplicate prompt");
        log_generation!(exhausted, subject = subject, attempts = 20, shortfall = 2);
        log_generation!(fallback, subject = subject, error = error);

        log_system_event!(startup, component = "server", "server starting");
        log_system_event!(config, "configuration loaded successfully");


        log_performance!("build_batch", duration_ms = 25, count = 10);
        log_performance!("fetch", duration_ms = 5);

        log_validation!(success, "configuration", "config validated");
        log_validation!(failure, "question", error = QuestionDefect::EmptyPrompt);
    }
}
