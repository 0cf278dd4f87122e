//! Usage extraction for `messages.create`.

use crate::client::MessagesResponse;
use crate::tracked::PROVIDER;
use clawmeter_core::{CallContext, ExtractError, UsageRecord};
use clawmeter_proxy::{CallOutcome, UsageExtractor, current_customer_id};
use clawmeter_tracker::UsageTracker;

/// Extractor for the `messages.create` method path.
///
/// On success it reads token counts from the response's usage block and
/// packages the response identity fields into record metadata. A response
/// with no usage block (a streaming partial, say) is a deliberate no-op, not
/// an error. On failure it emits a zero-token record carrying the classified
/// error fields, with the model taken from the call parameters.
pub struct MessagesCreateExtractor;

impl UsageExtractor for MessagesCreateExtractor {
    fn record(
        &self,
        outcome: CallOutcome<'_>,
        customer_id: Option<&str>,
        ctx: &CallContext,
        tracker: &UsageTracker,
    ) -> Result<(), ExtractError> {
        // Explicit call-time id wins; otherwise try the ambient binding.
        // An unresolved customer id never withholds telemetry.
        let customer = customer_id.map(str::to_string).or_else(current_customer_id);

        match outcome {
            CallOutcome::Success(value) => {
                let response = value.downcast_ref::<MessagesResponse>().ok_or_else(|| {
                    ExtractError::UnexpectedResultType {
                        method: ctx.method.clone(),
                    }
                })?;

                let Some(usage) = response.usage else {
                    return Ok(());
                };

                let mut metadata = serde_json::Map::new();
                metadata.insert("response_id".into(), response.id.clone().into());
                metadata.insert("type".into(), response.kind.clone().into());
                metadata.insert("role".into(), response.role.clone().into());
                metadata.insert(
                    "stop_reason".into(),
                    response
                        .stop_reason
                        .clone()
                        .map_or(serde_json::Value::Null, Into::into),
                );
                metadata.insert(
                    "stop_sequence".into(),
                    response
                        .stop_sequence
                        .clone()
                        .map_or(serde_json::Value::Null, Into::into),
                );

                tracker.submit(UsageRecord::success(
                    customer,
                    response.model.clone(),
                    usage.input_tokens,
                    usage.output_tokens,
                    PROVIDER,
                    metadata,
                    ctx,
                ));
            }
            CallOutcome::Failure(details) => {
                let model = ctx.param_str("model").unwrap_or("unknown").to_string();
                tracker.submit(UsageRecord::failure(customer, model, PROVIDER, details, ctx));
            }
        }

        Ok(())
    }
}
