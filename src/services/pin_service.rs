use rand::Rng;
use std::sync::Arc;
use uuid::Uuid;

use crate::database::store::EntityStore;
use crate::error::{Error, Result};
use crate::models::student::Student;
use crate::utils::random::RandomSource;
use crate::utils::validation::is_valid_pin;

pub const MAX_PIN_ATTEMPTS: usize = 10;

/// Uniform draw from 1000..=9999, so the PIN never needs padding.
pub fn generate_pin<R: Rng>(rng: &mut R) -> String {
    rng.gen_range(1000..=9999u16).to_string()
}

#[derive(Clone)]
pub struct PinService {
    store: Arc<dyn EntityStore>,
    random: RandomSource,
}

impl PinService {
    pub fn new(store: Arc<dyn EntityStore>, random: RandomSource) -> Self {
        Self { store, random }
    }

    /// Creates a student under a freshly drawn PIN.
    ///
    /// A PIN that is already taken, either by the pre-check or by a
    /// concurrent insert tripping the unique constraint, costs one attempt.
    pub async fn create_student(&self, teacher_id: Uuid, name: &str) -> Result<Student> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Invalid("Student name must not be blank".to_string()));
        }
        for attempt in 1..=MAX_PIN_ATTEMPTS {
            let pin = self.random.with(|rng| generate_pin(rng));
            if self.store.pin_exists(&pin).await? {
                tracing::debug!(attempt, "PIN candidate already taken");
                continue;
            }
            match self.store.insert_student(teacher_id, name, &pin).await {
                Ok(student) => {
                    tracing::info!(
                        student_id = %student.id,
                        %teacher_id,
                        attempt,
                        "Student created"
                    );
                    return Ok(student);
                }
                Err(Error::Conflict(constraint)) => {
                    tracing::debug!(attempt, %constraint, "PIN lost a concurrent insert");
                }
                Err(e) => return Err(e),
            }
        }
        tracing::warn!(%teacher_id, attempts = MAX_PIN_ATTEMPTS, "Gave up drawing a free PIN");
        Err(Error::PinExhausted {
            attempts: MAX_PIN_ATTEMPTS,
        })
    }

    pub async fn authenticate(&self, pin: &str) -> Result<Student> {
        let pin = pin.trim();
        if !is_valid_pin(pin) {
            return Err(Error::NotFound("Invalid PIN".to_string()));
        }
        self.store
            .find_student_by_pin(pin)
            .await?
            .ok_or_else(|| Error::NotFound("Invalid PIN".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryStore;
    use crate::database::store::MockEntityStore;
    use crate::models::teacher::NewTeacher;
    use chrono::Utc;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn generated_pins_are_four_digits() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..2_000 {
            let pin = generate_pin(&mut rng);
            assert!(is_valid_pin(&pin), "{}", pin);
            assert!(!pin.starts_with('0'));
        }
    }

    #[tokio::test]
    async fn exhausts_after_ten_taken_pins() {
        let mut store = MockEntityStore::new();
        store
            .expect_pin_exists()
            .times(MAX_PIN_ATTEMPTS)
            .returning(|_| Ok(true));
        store.expect_insert_student().never();

        let service = PinService::new(Arc::new(store), RandomSource::seeded(3));
        let err = service
            .create_student(Uuid::new_v4(), "Lena")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PinExhausted { attempts: 10 }));
    }

    #[tokio::test]
    async fn racing_inserts_count_as_collisions() {
        let mut store = MockEntityStore::new();
        store
            .expect_pin_exists()
            .times(MAX_PIN_ATTEMPTS)
            .returning(|_| Ok(false));
        store
            .expect_insert_student()
            .times(MAX_PIN_ATTEMPTS)
            .returning(|_, _, _| Err(Error::Conflict("students_pin_key".into())));

        let service = PinService::new(Arc::new(store), RandomSource::seeded(3));
        let err = service
            .create_student(Uuid::new_v4(), "Lena")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PinExhausted { .. }));
    }

    #[tokio::test]
    async fn retries_until_a_free_pin_is_found() {
        let mut store = MockEntityStore::new();
        let mut calls = 0;
        store.expect_pin_exists().times(3).returning(move |_| {
            calls += 1;
            Ok(calls < 3)
        });
        store
            .expect_insert_student()
            .times(1)
            .returning(|teacher_id, name, pin| {
                Ok(Student {
                    id: Uuid::new_v4(),
                    name: name.to_string(),
                    pin: pin.to_string(),
                    teacher_id,
                    created_at: Utc::now(),
                })
            });

        let service = PinService::new(Arc::new(store), RandomSource::seeded(9));
        let student = service.create_student(Uuid::new_v4(), "Omar").await.unwrap();
        assert!(is_valid_pin(&student.pin));
    }

    #[tokio::test]
    async fn blank_name_is_rejected_before_drawing_a_pin() {
        let mut store = MockEntityStore::new();
        store.expect_pin_exists().never();
        store.expect_insert_student().never();

        let service = PinService::new(Arc::new(store), RandomSource::seeded(3));
        let err = service
            .create_student(Uuid::new_v4(), "   ")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Invalid(_)));
    }

    #[tokio::test]
    async fn authenticate_finds_student_by_pin() {
        let store = Arc::new(MemoryStore::new());
        let teacher = store
            .insert_teacher(NewTeacher {
                name: "T".into(),
                email: "t@school.test".into(),
                password_hash: "x".into(),
            })
            .await
            .unwrap();
        let service = PinService::new(store.clone(), RandomSource::seeded(5));
        let created = service.create_student(teacher.id, "Mia").await.unwrap();

        let found = service.authenticate(&created.pin).await.unwrap();
        assert_eq!(found, created);
        assert!(matches!(
            service.authenticate("12").await,
            Err(Error::NotFound(_))
        ));
    }
}
