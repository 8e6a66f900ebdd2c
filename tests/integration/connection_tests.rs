/*!
 * Integration tests for connecting, switching and seeding databases
 */

use anyhow::Result;

use sqlchat::database::seed::{self, Student};
use sqlchat::database::{ConnectionManager, ConnectionTarget, SqlValue};
use sqlchat::errors::DatabaseError;

use crate::common;

async fn student_names(manager: &ConnectionManager) -> Result<Vec<SqlValue>> {
    let execution = manager.execute("SELECT NAME FROM STUDENT ORDER BY NAME", &[]).await?;
    Ok(execution.rows.into_iter().flatten().collect())
}

#[tokio::test]
async fn test_switchTo_withSecondDatabase_shouldQueryNewFile() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let first = common::create_student_db(dir.path(), "first.db", &[("Krish", "Data Science", "A", 90)])?;
    let second = common::create_student_db(dir.path(), "second.db", &[("Jacob", "DEVOPS", "A", 50)])?;

    let manager = ConnectionManager::connected(ConnectionTarget::file(&first)).await?;
    assert_eq!(student_names(&manager).await?, vec![SqlValue::from("Krish")]);

    manager.switch_to(ConnectionTarget::file(&second)).await?;

    assert_eq!(student_names(&manager).await?, vec![SqlValue::from("Jacob")]);
    assert!(matches!(
        manager.active_target().await,
        Some(ConnectionTarget::File(file)) if file.path == second
    ));
    Ok(())
}

#[tokio::test]
async fn test_switchTo_withMissingFile_shouldReturnNotFoundAndStayClosed() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let db = common::create_krish_john_db(dir.path())?;
    let missing = dir.path().join("missing.db");

    let manager = ConnectionManager::connected(ConnectionTarget::file(&db)).await?;
    let result = manager.switch_to(ConnectionTarget::file(&missing)).await;

    assert!(matches!(result, Err(DatabaseError::NotFound(path)) if path == missing));
    assert!(!manager.is_connected().await);
    assert!(!missing.exists());
    assert!(matches!(
        manager.execute("SELECT * FROM STUDENT", &[]).await,
        Err(DatabaseError::NoConnection)
    ));
    Ok(())
}

#[tokio::test]
async fn test_connect_withMissingFile_shouldKeepCurrentConnection() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let db = common::create_krish_john_db(dir.path())?;

    let manager = ConnectionManager::connected(ConnectionTarget::file(&db)).await?;
    let result = manager.connect(ConnectionTarget::file(dir.path().join("nope.db"))).await;

    assert!(matches!(result, Err(DatabaseError::NotFound(_))));
    assert!(manager.is_connected().await);
    assert_eq!(student_names(&manager).await?.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_close_calledTwice_shouldBeNoOp() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let db = common::create_krish_john_db(dir.path())?;

    let manager = ConnectionManager::connected(ConnectionTarget::file(&db)).await?;
    manager.close().await?;
    manager.close().await?;

    assert!(!manager.is_connected().await);
    assert!(manager.active_target().await.is_none());
    Ok(())
}

#[tokio::test]
async fn test_seedDemoDatabase_runTwice_shouldNotDuplicateRows() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let path = dir.path().join("data").join("student.db");

    assert_eq!(seed::seed_demo_database(&path).await?, seed::DEMO_STUDENTS.len());
    assert_eq!(seed::seed_demo_database(&path).await?, 0);

    let manager = ConnectionManager::connected(ConnectionTarget::file(&path)).await?;
    let students = seed::all_students(&manager).await?;
    assert_eq!(students.len(), 5);
    assert_eq!(students[0], Student::new("Krish", "Data Science", "A", 90));
    assert_eq!(students[4], Student::new("Dipesh", "DEVOPS", "A", 35));
    Ok(())
}

#[tokio::test]
async fn test_insertStudent_withNewRecord_shouldBeVisibleToReaders() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let db = common::create_krish_john_db(dir.path())?;

    let writer = ConnectionManager::connected(ConnectionTarget::file_rw(&db)).await?;
    let inserted = seed::insert_student(&writer, &Student::new("Mukesh", "Data Science", "A", 86)).await?;
    let duplicate = seed::insert_student(&writer, &Student::new("Mukesh", "Data Science", "A", 86)).await?;
    writer.close().await?;

    assert!(inserted);
    assert!(!duplicate);

    let reader = ConnectionManager::connected(ConnectionTarget::file(&db)).await?;
    assert_eq!(
        student_names(&reader).await?,
        vec![SqlValue::from("John"), SqlValue::from("Krish"), SqlValue::from("Mukesh")]
    );
    Ok(())
}

#[test]
fn test_connect_withUnreachableMySqlServer_shouldReturnConnectionError() {
    let manager = ConnectionManager::new();
    let target = ConnectionTarget::Network(
        sqlchat::database::NetworkTarget::new("127.0.0.1", "1", "root", "pw", "school").unwrap(),
    );

    // Nothing listens on port 1; without the mysql feature the backend is absent
    let result = tokio_test::block_on(manager.connect(target));

    assert!(matches!(result, Err(DatabaseError::Connection(_))));
    assert!(!tokio_test::block_on(manager.is_connected()));
}
