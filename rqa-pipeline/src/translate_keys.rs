//! Translation of exported keys to pipeline keys
//!
//! Exports name fields after the flow and question they came from. Each
//! remapping copies a present exported key to its pipeline name. Activation
//! messages can be matched by several activation remappings when a respondent
//! answered in an unexpected flow; only the first matching one applies.

use rqa_common::config::RapidProKeyRemapping;
use rqa_common::traced_data::{Metadata, TracedData};
use rqa_common::Result;
use std::collections::BTreeMap;
use tracing::{debug, info};

pub fn translate_rapid_pro_keys(
    user: &str,
    data: &mut [TracedData],
    remappings: &[RapidProKeyRemapping],
) -> Result<()> {
    let mut translated = 0usize;

    for td in data.iter_mut() {
        let mut remapped = BTreeMap::new();
        let mut activation_key: Option<&str> = None;

        for remapping in remappings {
            let Some(value) = td.get(&remapping.rapid_pro_key) else {
                continue;
            };

            if remapping.is_activation_message {
                if let Some(existing) = activation_key {
                    debug!(
                        uid = td.uid(),
                        kept = existing,
                        skipped = %remapping.pipeline_key,
                        "Message matches more than one activation key"
                    );
                    continue;
                }
                activation_key = Some(&remapping.pipeline_key);
            }
            remapped.insert(remapping.pipeline_key.clone(), value.clone());
        }

        if !remapped.is_empty() {
            translated += remapped.len();
            td.append_data(remapped, Metadata::new(user));
        }
    }

    info!("Translated {} keys across {} records", translated, data.len());
    Ok(())
}
