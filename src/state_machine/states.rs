use serde::{Deserialize, Serialize};
use std::fmt;

/// Offer status definitions matching the pipeline's status column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OfferStatus {
    /// Initial state when an offer is ingested
    #[sqlx(rename = "PENDING_REGISTRATION")]
    PendingRegistration,
    /// Offer is being worked without an attached step workflow
    #[sqlx(rename = "IN_LAVORO")]
    InLavoro,
    /// Department checks are running through workflow steps
    #[sqlx(rename = "CHECKS_IN_PROGRESS")]
    ChecksInProgress,
    /// All checks complete, quote awaiting dispatch
    #[sqlx(rename = "READY_TO_SEND")]
    ReadyToSend,
    /// Quote delivered to the client
    #[sqlx(rename = "SENT")]
    Sent,
    /// Client accepted the offer
    #[sqlx(rename = "ACCETTATA")]
    Accettata,
    /// Offer declined internally with a closed reason code
    #[sqlx(rename = "DECLINATA")]
    Declinata,
    /// Client did not accept; free-text reason
    #[sqlx(rename = "NON_ACCETTATA")]
    NonAccettata,
}

impl OfferStatus {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Accettata | Self::Declinata | Self::NonAccettata)
    }

    /// Check if this is an active working state (offer is being processed)
    pub fn is_in_progress(&self) -> bool {
        matches!(self, Self::InLavoro | Self::ChecksInProgress)
    }

    /// Check if this is a declined outcome (either decline flavor)
    pub fn is_declined(&self) -> bool {
        matches!(self, Self::Declinata | Self::NonAccettata)
    }

    /// Check if the offer counts as proposed in evolution rollups
    pub fn counts_as_proposed(&self) -> bool {
        !matches!(self, Self::PendingRegistration)
    }
}

impl fmt::Display for OfferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PendingRegistration => write!(f, "PENDING_REGISTRATION"),
            Self::InLavoro => write!(f, "IN_LAVORO"),
            Self::ChecksInProgress => write!(f, "CHECKS_IN_PROGRESS"),
            Self::ReadyToSend => write!(f, "READY_TO_SEND"),
            Self::Sent => write!(f, "SENT"),
            Self::Accettata => write!(f, "ACCETTATA"),
            Self::Declinata => write!(f, "DECLINATA"),
            Self::NonAccettata => write!(f, "NON_ACCETTATA"),
        }
    }
}

impl std::str::FromStr for OfferStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING_REGISTRATION" => Ok(Self::PendingRegistration),
            "IN_LAVORO" => Ok(Self::InLavoro),
            "CHECKS_IN_PROGRESS" => Ok(Self::ChecksInProgress),
            "READY_TO_SEND" => Ok(Self::ReadyToSend),
            "SENT" => Ok(Self::Sent),
            "ACCETTATA" => Ok(Self::Accettata),
            "DECLINATA" => Ok(Self::Declinata),
            "NON_ACCETTATA" => Ok(Self::NonAccettata),
            _ => Err(format!("Invalid offer status: {s}")),
        }
    }
}

/// Workflow step status within one department's stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Initial state when the step sequence is created
    #[sqlx(rename = "pending")]
    Pending,
    /// Department is actively working the step
    #[sqlx(rename = "in_progress")]
    InProgress,
    /// Step finished; duration is fixed
    #[sqlx(rename = "completed")]
    Completed,
    /// Step bypassed without work
    #[sqlx(rename = "skipped")]
    Skipped,
}

impl StepStatus {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Skipped)
    }

    /// Check if this is an active state (step is being processed)
    pub fn is_active(&self) -> bool {
        matches!(self, Self::InProgress)
    }

    /// Check if this step unblocks steps at higher order indices
    pub fn satisfies_ordering(&self) -> bool {
        matches!(self, Self::Completed | Self::Skipped)
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

impl std::str::FromStr for StepStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "skipped" => Ok(Self::Skipped),
            _ => Err(format!("Invalid step status: {s}")),
        }
    }
}

/// Offer priority levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[sqlx(rename = "bassa")]
    Bassa,
    #[sqlx(rename = "media")]
    Media,
    #[sqlx(rename = "alta")]
    Alta,
    #[sqlx(rename = "urgente")]
    Urgente,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bassa => write!(f, "bassa"),
            Self::Media => write!(f, "media"),
            Self::Alta => write!(f, "alta"),
            Self::Urgente => write!(f, "urgente"),
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bassa" => Ok(Self::Bassa),
            "media" => Ok(Self::Media),
            "alta" => Ok(Self::Alta),
            "urgente" => Ok(Self::Urgente),
            _ => Err(format!("Invalid priority: {s}")),
        }
    }
}

/// Departments that own workflow steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
pub enum Department {
    #[sqlx(rename = "commerciale")]
    Commerciale,
    #[sqlx(rename = "fattibilita")]
    Fattibilita,
    #[sqlx(rename = "tecnico")]
    Tecnico,
    #[sqlx(rename = "acquisti")]
    Acquisti,
    #[sqlx(rename = "pianificazione")]
    Pianificazione,
}

impl Department {
    /// All departments, in pipeline order
    pub const ALL: [Department; 5] = [
        Self::Commerciale,
        Self::Fattibilita,
        Self::Tecnico,
        Self::Acquisti,
        Self::Pianificazione,
    ];
}

impl fmt::Display for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Commerciale => write!(f, "commerciale"),
            Self::Fattibilita => write!(f, "fattibilita"),
            Self::Tecnico => write!(f, "tecnico"),
            Self::Acquisti => write!(f, "acquisti"),
            Self::Pianificazione => write!(f, "pianificazione"),
        }
    }
}

impl std::str::FromStr for Department {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "commerciale" => Ok(Self::Commerciale),
            "fattibilita" => Ok(Self::Fattibilita),
            "tecnico" => Ok(Self::Tecnico),
            "acquisti" => Ok(Self::Acquisti),
            "pianificazione" => Ok(Self::Pianificazione),
            _ => Err(format!("Invalid department: {s}")),
        }
    }
}

/// Closed reason codes for internally declined offers.
///
/// The canonical wire form is the spaced spelling; `FromStr` also accepts
/// the underscored spelling found in older rows (see DESIGN.md on the
/// spaced/underscored divergence in historical data).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
pub enum DeclinedReason {
    #[serde(rename = "ARTICOLO NON FATTIBILE")]
    #[sqlx(rename = "ARTICOLO NON FATTIBILE")]
    ArticoloNonFattibile,
    #[serde(rename = "TEMPI DI CONSEGNA")]
    #[sqlx(rename = "TEMPI DI CONSEGNA")]
    TempiDiConsegna,
    #[serde(rename = "SOVRACCARICO PRODUTTIVO")]
    #[sqlx(rename = "SOVRACCARICO PRODUTTIVO")]
    SovraccaricoProduttivo,
    #[serde(rename = "QUANTITÀ ALTE")]
    #[sqlx(rename = "QUANTITÀ ALTE")]
    QuantitaAlte,
    #[serde(rename = "QUANTITÀ BASSE")]
    #[sqlx(rename = "QUANTITÀ BASSE")]
    QuantitaBasse,
    #[serde(rename = "CLIENTE NON STRATEGICO")]
    #[sqlx(rename = "CLIENTE NON STRATEGICO")]
    ClienteNonStrategico,
    #[serde(rename = "COMPONENTE NON STRATEGICO")]
    #[sqlx(rename = "COMPONENTE NON STRATEGICO")]
    ComponenteNonStrategico,
    #[serde(rename = "TARGET BASSO")]
    #[sqlx(rename = "TARGET BASSO")]
    TargetBasso,
}

impl fmt::Display for DeclinedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ArticoloNonFattibile => write!(f, "ARTICOLO NON FATTIBILE"),
            Self::TempiDiConsegna => write!(f, "TEMPI DI CONSEGNA"),
            Self::SovraccaricoProduttivo => write!(f, "SOVRACCARICO PRODUTTIVO"),
            Self::QuantitaAlte => write!(f, "QUANTITÀ ALTE"),
            Self::QuantitaBasse => write!(f, "QUANTITÀ BASSE"),
            Self::ClienteNonStrategico => write!(f, "CLIENTE NON STRATEGICO"),
            Self::ComponenteNonStrategico => write!(f, "COMPONENTE NON STRATEGICO"),
            Self::TargetBasso => write!(f, "TARGET BASSO"),
        }
    }
}

impl std::str::FromStr for DeclinedReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Historical rows carry underscored and unaccented spellings.
        let normalized = s.trim().replace('_', " ").replace('À', "A");
        match normalized.as_str() {
            "ARTICOLO NON FATTIBILE" => Ok(Self::ArticoloNonFattibile),
            "TEMPI DI CONSEGNA" | "TEMPI CONSEGNA" => Ok(Self::TempiDiConsegna),
            "SOVRACCARICO PRODUTTIVO" => Ok(Self::SovraccaricoProduttivo),
            "QUANTITA ALTE" => Ok(Self::QuantitaAlte),
            "QUANTITA BASSE" => Ok(Self::QuantitaBasse),
            "CLIENTE NON STRATEGICO" => Ok(Self::ClienteNonStrategico),
            "COMPONENTE NON STRATEGICO" => Ok(Self::ComponenteNonStrategico),
            "TARGET BASSO" => Ok(Self::TargetBasso),
            _ => Err(format!("Invalid declined reason: {s}")),
        }
    }
}

/// Default state for new offers
impl Default for OfferStatus {
    fn default() -> Self {
        Self::PendingRegistration
    }
}

/// Default state for new workflow steps
impl Default for StepStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// Default priority for new offers
impl Default for Priority {
    fn default() -> Self {
        Self::Media
    }
}
