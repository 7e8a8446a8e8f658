//! Populates a database with demo users, prayer requests, responses and
//! updates. Everything goes through the regular lifecycle operations so the
//! notification feeds line up with the data.

use std::path::PathBuf;
use std::sync::Arc;

use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};
use tracing::info;

use whisper_db::models::UserRow;
use whisper_db::{Database, Error, FanOut};
use whisper_notify::Notifier;

const DEMO_PASSWORD: &str = "Password123!";
const RANDOM_PRAYER_COUNT: usize = 5;

const DEMO_USERS: &[(&str, bool)] = &[
    ("mary@faithwhisper.app", true),
    ("john@faithwhisper.app", true),
    ("esther@faithwhisper.app", false),
];

const PRAYER_TEMPLATES: &[(&str, &str)] = &[
    ("Guidance in a decision", "Please pray for clarity and wisdom as I choose between two job opportunities."),
    ("Family unity", "Please pray for reconciliation and peace in our family conversations."),
    ("Health and strength", "Please pray for healing and renewed strength during this recovery season."),
    ("Financial provision", "Please pray for provision as we manage urgent household expenses."),
    ("Peace over anxiety", "Please pray for calm, steady faith, and restful sleep this week."),
    ("Workplace favor", "Please pray for grace, favor, and good relationships at work."),
    ("Safe travel", "Please pray for safe flights and health during upcoming travel."),
    ("Spiritual growth", "Please pray that I stay disciplined in prayer and Scripture daily."),
];

const RESPONSE_MESSAGES: &[&str] = &[
    "Praying for wisdom and peace in this season.",
    "Standing with you in prayer today.",
    "Praying for strength and open doors.",
    "Lifting this up and believing for breakthrough.",
    "Praying God gives you peace and direction.",
];

const UPDATE_MESSAGES: &[&str] = &[
    "Thank you for praying. I have started seeing progress.",
    "I appreciate everyone's support and prayers.",
    "Small breakthrough today. Grateful for your prayers.",
    "Please continue praying, I am feeling encouraged.",
];

struct Seeder {
    db: Arc<Database>,
    notifier: Notifier,
}

impl Seeder {
    async fn notify<T>(&self, (value, fan_out): (T, FanOut)) -> T {
        self.notifier.fan_out(fan_out).await;
        value
    }

    fn ensure_user(&self, email: &str, volunteer: bool, password_hash: &str) -> anyhow::Result<UserRow> {
        let user = match self.db.create_user(email, password_hash) {
            Ok(user) => user,
            Err(Error::EmailTaken) => self
                .db
                .get_user_by_email(email)?
                .ok_or_else(|| anyhow::anyhow!("demo user {} vanished", email))?,
            Err(e) => return Err(e.into()),
        };
        Ok(self.db.set_volunteered_to_pray(&user.id, volunteer)?)
    }

    /// Three hand-written requests covering every notification type.
    async fn fixed_scenario(&self, mary: &UserRow, john: &UserRow, esther: &UserRow) -> anyhow::Result<()> {
        let healing = self
            .notify(self.db.create_prayer(
                &mary.id,
                Some("Healing & peace"),
                "Please pray for my mom's recovery and peace for our family this week.",
            )?)
            .await;
        self.notify(self.db.respond(&john.id, &healing.id, Some("Praying for strength and comfort for your family."))?)
            .await;
        self.notify(self.db.respond(&esther.id, &healing.id, None)?).await;
        self.notify(self.db.post_update(
            &mary.id,
            &healing.id,
            "Thank you all. She has started treatment and we are hopeful.",
        )?)
        .await;

        let interview = self
            .notify(self.db.create_prayer(
                &john.id,
                Some("Job interview"),
                "Please pray for wisdom and confidence for my interview tomorrow.",
            )?)
            .await;
        self.notify(self.db.respond(&mary.id, &interview.id, Some("Praying that you speak clearly and walk in favor."))?)
            .await;
        self.notify(self.db.post_update(
            &john.id,
            &interview.id,
            "Interview completed today. Thank you for your prayers.",
        )?)
        .await;

        let travel = self
            .notify(self.db.create_prayer(
                &esther.id,
                Some("Travel safety"),
                "Please pray for safe travel and health during my trip.",
            )?)
            .await;
        self.notify(self.db.respond(&john.id, &travel.id, Some("Thankful this went well. Praying continued peace."))?)
            .await;
        self.notify(self.db.respond(&mary.id, &travel.id, None)?).await;
        self.notify(self.db.post_update(
            &esther.id,
            &travel.id,
            "Trip completed safely. Grateful for everyone praying.",
        )?)
        .await;
        self.notify(self.db.close_prayer(&esther.id, &travel.id)?).await;

        Ok(())
    }

    async fn random_prayers(&self, users: &[UserRow]) -> anyhow::Result<()> {
        for _ in 0..RANDOM_PRAYER_COUNT {
            // ThreadRng is not Send; draw everything for this round up front
            let (title, body, requester, responders, messages, update, close) = {
                let mut rng = rand::rng();
                let &(title, body) = PRAYER_TEMPLATES.choose(&mut rng).unwrap_or(&PRAYER_TEMPLATES[0]);
                let requester = users.choose(&mut rng).unwrap_or(&users[0]).clone();

                let mut others: Vec<UserRow> =
                    users.iter().filter(|u| u.id != requester.id).cloned().collect();
                others.shuffle(&mut rng);
                let take = rng.random_range(0..=others.len());
                others.truncate(take);

                let messages: Vec<Option<&str>> = others
                    .iter()
                    .map(|_| {
                        if rng.random_bool(0.5) {
                            RESPONSE_MESSAGES.choose(&mut rng).copied()
                        } else {
                            None
                        }
                    })
                    .collect();
                let update = rng
                    .random_bool(0.5)
                    .then(|| UPDATE_MESSAGES.choose(&mut rng).copied())
                    .flatten();
                let close = rng.random_bool(0.2);
                (title, body, requester, others, messages, update, close)
            };

            let prayer = self
                .notify(self.db.create_prayer(&requester.id, Some(title), body)?)
                .await;
            for (responder, message) in responders.iter().zip(messages) {
                self.notify(self.db.respond(&responder.id, &prayer.id, message)?).await;
            }
            if let Some(update) = update {
                self.notify(self.db.post_update(&requester.id, &prayer.id, update)?).await;
            }
            if close {
                self.notify(self.db.close_prayer(&requester.id, &prayer.id)?).await;
            }
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "whisper_seed=info,whisper_db=info".into()),
        )
        .init();

    let db_path: PathBuf = std::env::var("WHISPER_DB_PATH")
        .unwrap_or_else(|_| "whisper.db".into())
        .into();
    let db = Arc::new(Database::open(&db_path)?);
    let seeder = Seeder {
        notifier: Notifier::new(db.clone()),
        db,
    };

    let password_hash = whisper_api::auth::hash_password(DEMO_PASSWORD)?;
    let mut users = Vec::with_capacity(DEMO_USERS.len());
    for &(email, volunteer) in DEMO_USERS {
        users.push(seeder.ensure_user(email, volunteer, &password_hash)?);
    }

    seeder.fixed_scenario(&users[0], &users[1], &users[2]).await?;
    seeder.random_prayers(&users).await?;

    info!(
        "Seeded {} demo users (password: {}) into {}",
        users.len(),
        DEMO_PASSWORD,
        db_path.display()
    );
    Ok(())
}
