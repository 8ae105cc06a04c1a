//! Derivation of the reminders attached to a schedule item.

use std::collections::HashMap;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::calendar::{add_business_days, format_date, sub_business_days};
use crate::cascade::Notice;
use crate::models::{AlertType, ScheduleAlert, ScheduleItem};

fn alert(
    item: &ScheduleItem,
    alert_type: AlertType,
    alert_date: NaiveDate,
    message: String,
) -> ScheduleAlert {
    ScheduleAlert {
        id: Uuid::new_v4(),
        project_id: item.project_id,
        schedule_item_id: item.id,
        alert_type,
        alert_date,
        message,
        is_dismissed: false,
    }
}

/// Supplier-call, fabrication and measurement reminders implied by the
/// item's current dates. Completed or undated items get none.
///
/// `project` is the full project state, used to resolve the step the
/// measurement waits on.
pub fn plan_alerts(item: &ScheduleItem, project: &[ScheduleItem]) -> Vec<ScheduleAlert> {
    let Some(start) = item.start_date.filter(|_| !item.is_completed()) else {
        return Vec::new();
    };
    let logistics = &item.logistics;
    let mut alerts = Vec::new();

    if let Some(lead) = logistics.supplier_lead_days {
        let supplier = logistics.supplier_name.as_deref().unwrap_or("supplier");
        let phone = logistics
            .supplier_phone
            .as_deref()
            .map(|p| format!(" ({p})"))
            .unwrap_or_default();
        alerts.push(alert(
            item,
            AlertType::SupplierCall,
            sub_business_days(start, i64::from(lead)),
            format!(
                "Call {supplier}{phone} to confirm {} starting {}",
                item.step_name,
                format_date(start)
            ),
        ));
    }

    if let Some(lead) = logistics.fabrication_lead_days {
        let date = logistics
            .fabrication_start_date
            .unwrap_or_else(|| sub_business_days(start, i64::from(lead)));
        alerts.push(alert(
            item,
            AlertType::FabricationStart,
            date,
            format!("Start fabrication for {} (on site {})", item.step_name, format_date(start)),
        ));
    }

    if logistics.measurement_required {
        let by_step: HashMap<&str, &ScheduleItem> =
            project.iter().map(|i| (i.step_id.as_str(), i)).collect();
        let reference = logistics
            .measurement_after_step_id
            .as_deref()
            .and_then(|id| by_step.get(id))
            .and_then(|r| r.end_date.map(|end| (r.step_name.as_str(), end)));

        let (date, message) = match reference {
            Some((after, end)) => (
                add_business_days(end, 1),
                format!("Take measurements for {} once {after} is done", item.step_name),
            ),
            None => (start, format!("Take measurements for {}", item.step_name)),
        };
        let message = match &logistics.measurement_notes {
            Some(notes) => format!("{message}: {notes}"),
            None => message,
        };
        alerts.push(alert(item, AlertType::Measurement, date, message));
    }

    alerts
}

/// Turn a cascade notice into a stored alert.
pub fn notice_alert(item: &ScheduleItem, notice: &Notice) -> ScheduleAlert {
    alert(item, notice.alert_type, notice.alert_date, notice.message.clone())
}
