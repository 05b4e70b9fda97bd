//! Built-in header aliases per source kind. Order matters: the first alias
//! found in a file's header row binds the field.

pub type AliasTable = &'static [(&'static str, &'static [&'static str])];

const AFFILIATE: &[&str] = &[
    "affiliate",
    "affiliate_id",
    "affiliate_name",
    "affiliate_username",
    "partner",
    "partner_id",
];

pub const COHORT: AliasTable = &[
    (
        "cohort_date",
        &[
            "cohort_date",
            "cohort",
            "acquisition_date",
            "acquisition_month",
            "registration_month",
            "first_deposit_month",
            "ftd_month",
            "month",
            "date",
        ],
    ),
    ("affiliate", AFFILIATE),
    (
        "cohort_size",
        &["cohort_size", "size", "users", "players", "customers", "ftd", "ftds"],
    ),
    ("metric", &["metric", "kpi", "measure", "value_type"]),
];

pub const FINANCIAL: AliasTable = &[
    ("affiliate", AFFILIATE),
    ("month", &["month", "period", "reporting_month", "date"]),
    (
        "users",
        &["users", "active_users", "active_players", "players", "ftd", "ftds"],
    ),
    (
        "profit",
        &[
            "profit",
            "net_revenue",
            "ngr",
            "net_gaming_revenue",
            "revenue",
        ],
    ),
    (
        "cost",
        &[
            "paid_commission",
            "commission_paid",
            "commission",
            "payout",
            "cost",
        ],
    ),
];

pub const PAYMENTS: AliasTable = &[
    ("affiliate", AFFILIATE),
    ("date", &["payment_date", "paid_at", "paid_on", "date", "month"]),
    ("amount", &["amount", "paid_amount", "payment", "total"]),
    ("currency", &["currency", "ccy"]),
    ("status", &["status", "payment_status"]),
];
