use tracing::{debug, warn};

use crate::analysis::lof::{LocalOutlierFactor, LofError};
use crate::analysis::stats;
use crate::detectors::Detector;
use crate::types::anomaly::{DetectionResult, TransactionStatistics};
use crate::types::config::{AmountThresholds, MIN_AMOUNT_HISTORY};
use crate::types::transaction::{Transaction, TransactionType};

pub const AMOUNT_CONFIDENCE: f64 = 0.85;

/// Flags amounts that are density outliers among prior transactions of the
/// same type (income against income, expense against expense).
#[derive(Debug, Clone)]
pub struct AmountDetector {
    min_transactions: usize,
    lof: LocalOutlierFactor,
}

impl Default for AmountDetector {
    fn default() -> Self {
        Self::new(AmountThresholds::default())
    }
}

impl AmountDetector {
    pub fn new(thresholds: AmountThresholds) -> Self {
        Self {
            min_transactions: thresholds.min_transactions.max(MIN_AMOUNT_HISTORY),
            lof: LocalOutlierFactor::new(thresholds.neighbors, thresholds.contamination),
        }
    }

    /// Runs the outlier test with the current amount appended last and
    /// reports whether that last sample is an outlier.
    fn current_is_outlier(&self, cohort: &[f64], current: f64) -> Result<bool, LofError> {
        let mut samples = Vec::with_capacity(cohort.len() + 1);
        samples.extend_from_slice(cohort);
        samples.push(current);

        let fit = self.lof.fit_predict(&samples)?;
        debug!(
            score = fit.scores[fit.scores.len() - 1],
            threshold = fit.threshold,
            neighbors = fit.neighbors,
            "Scored amount"
        );
        Ok(fit.outliers[fit.outliers.len() - 1])
    }

    /// Per-type median/min/max/count over `transactions`.
    /// `None` when no transaction is classified as income or expense.
    pub fn statistics(&self, transactions: &[Transaction]) -> Option<TransactionStatistics> {
        summarize(transactions)
    }
}

impl Detector for AmountDetector {
    fn detect(&self, current: &Transaction, prior: &[Transaction]) -> DetectionResult {
        if prior.len() < self.min_transactions {
            return DetectionResult::normal(format!(
                "Insufficient historical data (need at least {} transactions)",
                self.min_transactions
            ));
        }

        let cohort: Vec<f64> = prior
            .iter()
            .filter(|t| t.transaction_type == current.transaction_type)
            .map(|t| t.amount)
            .collect();
        if cohort.len() < self.min_transactions {
            return DetectionResult::normal(format!(
                "Insufficient transactions of type {}",
                current.transaction_type.as_str()
            ));
        }

        match self.current_is_outlier(&cohort, current.amount) {
            Ok(true) => explain(current, &cohort),
            Ok(false) => DetectionResult::normal("Transaction amount appears normal"),
            Err(e) => {
                warn!(transaction_id = %current.id, error = %e, "Amount outlier analysis failed");
                DetectionResult::normal("Could not perform anomaly analysis")
            }
        }
    }
}

fn explain(current: &Transaction, cohort: &[f64]) -> DetectionResult {
    let mean = stats::mean(cohort).unwrap_or(0.0);
    let median = stats::median(cohort).unwrap_or(0.0);
    let ratio = if median > 0.0 {
        current.amount / median
    } else {
        f64::INFINITY
    };
    debug!(transaction_id = %current.id, mean, median, ratio, "Amount anomaly");

    let detail = if ratio > 1.0 {
        format!("{:.1}x larger than median", ratio)
    } else {
        format!("{:.1}x smaller than median", 1.0 / ratio)
    };

    DetectionResult::anomaly(
        AMOUNT_CONFIDENCE,
        format!(
            "Unusual {}: {}\nTypical amount (median): {}\nTransaction is {}",
            current.transaction_type.as_str(),
            format_money(current.amount),
            format_money(median),
            detail
        ),
    )
}

/// Summarise amounts per type. Empty partitions contribute no fields; an
/// input with no income or expense transactions yields `None`.
pub fn summarize(transactions: &[Transaction]) -> Option<TransactionStatistics> {
    let amounts_of = |kind: TransactionType| -> Vec<f64> {
        transactions
            .iter()
            .filter(|t| t.transaction_type == kind)
            .map(|t| t.amount)
            .collect()
    };
    let income = amounts_of(TransactionType::Income);
    let expense = amounts_of(TransactionType::Expense);

    let mut summary = TransactionStatistics::default();
    if !income.is_empty() {
        summary.income_median = stats::median(&income);
        summary.income_min = stats::min(&income);
        summary.income_max = stats::max(&income);
        summary.income_count = Some(income.len());
    }
    if !expense.is_empty() {
        summary.expense_median = stats::median(&expense);
        summary.expense_min = stats::min(&expense);
        summary.expense_max = stats::max(&expense);
        summary.expense_count = Some(expense.len());
    }

    if summary.is_empty() {
        None
    } else {
        Some(summary)
    }
}

/// `$1,234.56` style rendering.
fn format_money(value: f64) -> String {
    if !value.is_finite() {
        return format!("${}", value);
    }
    let fixed = format!("{:.2}", value.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}${}.{}", sign, grouped, cents)
}
