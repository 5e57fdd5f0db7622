//! Catalog storage tests
//!
//! Migrations, service operations, cascades and tree integrity against a
//! temporary SQLite database

use anyhow::Result;
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, EntityTrait, PaginatorTrait, Set};
use tempfile::NamedTempFile;

use visor::database::entities::*;
use visor::database::setup_database;
use visor::errors::CatalogError;
use visor::services::*;

/// Create a test database connection with migrations
async fn setup_test_db() -> Result<(DatabaseConnection, NamedTempFile)> {
    let temp_file = NamedTempFile::new()?;
    let db_url = format!("sqlite://{}?mode=rwc", temp_file.path().display());

    let db = Database::connect(&db_url).await?;
    setup_database(&db).await?;

    Ok((db, temp_file))
}

fn project_input(short_key: &str) -> ProjectInput {
    ProjectInput {
        short_key: short_key.to_string(),
        name: format!("Project {}", short_key),
        logo_small_url: None,
        logo_full_url: None,
        zoom_level: 6.0,
        center_x: -74.08,
        center_y: 4.6,
        panel_visible: true,
        base_map: None,
    }
}

fn group_input(project_id: i32, name: &str, order: i32, parent: Option<i32>) -> GroupInput {
    GroupInput {
        project_id,
        name: name.to_string(),
        order,
        fold_state: None,
        parent_group: parent,
        color: None,
    }
}

fn layer_input(group_id: i32, name: &str, order: i32) -> LayerInput {
    LayerInput {
        group_id,
        source_name: format!("i2d:{}", name.to_lowercase()),
        display_name: name.to_string(),
        store_name: "i2d".to_string(),
        initial_visible: false,
        metadata_ref: None,
        order,
    }
}

#[tokio::test]
async fn test_database_migrations() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;

    assert_eq!(projects::Entity::find().count(&db).await?, 0);
    assert_eq!(layer_groups::Entity::find().count(&db).await?, 0);
    assert_eq!(layers::Entity::find().count(&db).await?, 0);
    assert_eq!(default_layers::Entity::find().count(&db).await?, 0);

    Ok(())
}

#[tokio::test]
async fn test_group_color_default_then_normalized_update() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let projects = ProjectService::new(db.clone());
    let groups = LayerGroupService::new(db.clone());

    let project = projects.create_project(project_input("test")).await?;
    let g1 = groups
        .create_group(group_input(project.id, "Test Group", 0, None))
        .await?;
    assert_eq!(g1.color, "#E3E3E3");

    let patch = GroupPatch {
        color: Some(Some("#ff5733".to_string())),
        ..Default::default()
    };
    groups.update_group(g1.id, patch).await?;

    let stored = groups.get_group(g1.id).await?;
    assert_eq!(stored.color, "#FF5733");

    // null resets to the default
    let patch = GroupPatch {
        color: Some(None),
        ..Default::default()
    };
    let reset = groups.update_group(g1.id, patch).await?;
    assert_eq!(reset.color, "#E3E3E3");

    Ok(())
}

#[tokio::test]
async fn test_cross_project_parent_is_rejected() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let projects = ProjectService::new(db.clone());
    let groups = LayerGroupService::new(db.clone());

    let p1 = projects.create_project(project_input("p1")).await?;
    let p2 = projects.create_project(project_input("p2")).await?;
    let g1 = groups.create_group(group_input(p1.id, "g1", 0, None)).await?;
    let g2 = groups.create_group(group_input(p2.id, "g2", 0, None)).await?;

    let patch = GroupPatch {
        parent_group: Some(Some(g1.id)),
        ..Default::default()
    };
    let err = groups.update_group(g2.id, patch).await.unwrap_err();
    assert!(matches!(err, CatalogError::CrossProject(_)));

    let err = groups
        .create_group(group_input(p2.id, "g3", 0, Some(g1.id)))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::CrossProject(_)));

    // Nothing was written
    assert!(groups.get_group(g2.id).await?.parent_group_id.is_none());
    assert_eq!(layer_groups::Entity::find().count(&db).await?, 2);

    Ok(())
}

#[tokio::test]
async fn test_unknown_parent_is_not_found() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let project = ProjectService::new(db.clone())
        .create_project(project_input("eco"))
        .await?;

    let err = LayerGroupService::new(db.clone())
        .create_group(group_input(project.id, "orphan", 0, Some(999)))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::NotFound { .. }));

    Ok(())
}

#[tokio::test]
async fn test_cycle_rejected_before_persistence() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let project = ProjectService::new(db.clone())
        .create_project(project_input("eco"))
        .await?;
    let groups = LayerGroupService::new(db.clone());

    let a = groups.create_group(group_input(project.id, "A", 0, None)).await?;
    let b = groups
        .create_group(group_input(project.id, "B", 0, Some(a.id)))
        .await?;
    let c = groups
        .create_group(group_input(project.id, "C", 0, Some(b.id)))
        .await?;

    for parent in [a.id, b.id, c.id] {
        let patch = GroupPatch {
            parent_group: Some(Some(parent)),
            ..Default::default()
        };
        let err = groups.update_group(a.id, patch).await.unwrap_err();
        assert!(matches!(err, CatalogError::CyclicReference(_)), "parent {}", parent);
    }
    assert!(groups.get_group(a.id).await?.parent_group_id.is_none());

    Ok(())
}

#[tokio::test]
async fn test_corrupted_tree_fails_serialization() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let project = ProjectService::new(db.clone())
        .create_project(project_input("eco"))
        .await?;
    let groups = LayerGroupService::new(db.clone());

    let a = groups.create_group(group_input(project.id, "A", 0, None)).await?;
    let b = groups
        .create_group(group_input(project.id, "B", 0, Some(a.id)))
        .await?;
    assert_eq!(b.parent_group_id, Some(a.id));

    // Bypass validation and close the loop A -> B -> A
    let mut corrupt: layer_groups::ActiveModel = a.clone().into();
    corrupt.parent_group_id = Set(Some(b.id));
    corrupt.update(&db).await?;

    let catalog = CatalogQuery::new(db.clone());
    let err = catalog.project_tree(project.id).await.unwrap_err();
    assert!(matches!(err, CatalogError::Structural(_)));

    let err = catalog.group_tree(a.id).await.unwrap_err();
    assert!(matches!(err, CatalogError::Structural(_)));

    Ok(())
}

#[tokio::test]
async fn test_project_tree_ordering() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let project = ProjectService::new(db.clone())
        .create_project(project_input("eco"))
        .await?;
    let groups = LayerGroupService::new(db.clone());
    let layers = LayerService::new(db.clone());

    let b = groups.create_group(group_input(project.id, "B", 1, None)).await?;
    groups.create_group(group_input(project.id, "A", 1, None)).await?;
    groups.create_group(group_input(project.id, "C", 0, None)).await?;
    groups
        .create_group(group_input(project.id, "B.2", 2, Some(b.id)))
        .await?;
    groups
        .create_group(group_input(project.id, "B.1", 1, Some(b.id)))
        .await?;
    layers.create_layer(layer_input(b.id, "Zonas", 0)).await?;
    layers.create_layer(layer_input(b.id, "Areas", 0)).await?;

    let tree = CatalogQuery::new(db.clone()).project_tree(project.id).await?;
    let names: Vec<&str> = tree.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(names, vec!["C", "A", "B"]);

    let b_view = &tree[2];
    let sub: Vec<&str> = b_view.subgroups.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(sub, vec!["B.1", "B.2"]);
    let layer_names: Vec<&str> = b_view.layers.iter().map(|l| l.display_name.as_str()).collect();
    assert_eq!(layer_names, vec!["Areas", "Zonas"]);

    // Repeated reads agree
    let again = CatalogQuery::new(db.clone()).project_tree(project.id).await?;
    assert_eq!(tree, again);

    Ok(())
}

#[tokio::test]
async fn test_query_filters() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let projects = ProjectService::new(db.clone());
    let groups = LayerGroupService::new(db.clone());
    let layers = LayerService::new(db.clone());
    let catalog = CatalogQuery::new(db.clone());

    let p1 = projects.create_project(project_input("p1")).await?;
    let p2 = projects.create_project(project_input("p2")).await?;
    let root = groups.create_group(group_input(p1.id, "root", 0, None)).await?;
    let child = groups
        .create_group(group_input(p1.id, "child", 0, Some(root.id)))
        .await?;
    let other = groups.create_group(group_input(p2.id, "other", 0, None)).await?;
    layers.create_layer(layer_input(root.id, "L1", 0)).await?;
    layers.create_layer(layer_input(child.id, "L2", 0)).await?;
    layers.create_layer(layer_input(other.id, "L3", 0)).await?;

    assert_eq!(catalog.groups_for_project(p1.id, false).await?.len(), 2);
    let top = catalog.groups_for_project(p1.id, true).await?;
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].id, root.id);

    let by_project = catalog
        .layers_for(LayerFilter { project_id: Some(p1.id), group_id: None })
        .await?;
    assert_eq!(by_project.len(), 2);

    let by_group = catalog
        .layers_for(LayerFilter { project_id: None, group_id: Some(child.id) })
        .await?;
    assert_eq!(by_group.len(), 1);
    assert_eq!(by_group[0].display_name, "L2");

    let both = catalog
        .layers_for(LayerFilter { project_id: Some(p2.id), group_id: Some(child.id) })
        .await?;
    assert!(both.is_empty());

    assert_eq!(catalog.layers_for(LayerFilter::default()).await?.len(), 3);

    Ok(())
}

#[tokio::test]
async fn test_delete_group_cascades() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let project = ProjectService::new(db.clone())
        .create_project(project_input("eco"))
        .await?;
    let groups = LayerGroupService::new(db.clone());
    let layers = LayerService::new(db.clone());
    let defaults = DefaultLayerService::new(db.clone());

    let root = groups.create_group(group_input(project.id, "root", 0, None)).await?;
    let child = groups
        .create_group(group_input(project.id, "child", 0, Some(root.id)))
        .await?;
    let grandchild = groups
        .create_group(group_input(project.id, "grandchild", 0, Some(child.id)))
        .await?;
    let keep = groups.create_group(group_input(project.id, "keep", 1, None)).await?;

    let l1 = layers.create_layer(layer_input(grandchild.id, "deep", 0)).await?;
    layers.create_layer(layer_input(root.id, "shallow", 0)).await?;
    let kept_layer = layers.create_layer(layer_input(keep.id, "kept", 0)).await?;
    defaults
        .set_default_layer(project.id, DefaultLayerInput { layer_id: l1.id, visible_default: true })
        .await?;

    groups.delete_group(root.id).await?;

    let remaining: Vec<i32> = layer_groups::Entity::find()
        .all(&db)
        .await?
        .into_iter()
        .map(|g| g.id)
        .collect();
    assert_eq!(remaining, vec![keep.id]);

    let remaining_layers = layers::Entity::find().all(&db).await?;
    assert_eq!(remaining_layers.len(), 1);
    assert_eq!(remaining_layers[0].id, kept_layer.id);
    assert_eq!(default_layers::Entity::find().count(&db).await?, 0);

    Ok(())
}

#[tokio::test]
async fn test_delete_project_cascades() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let projects = ProjectService::new(db.clone());
    let groups = LayerGroupService::new(db.clone());
    let layers = LayerService::new(db.clone());

    let doomed = projects.create_project(project_input("doomed")).await?;
    let survivor = projects.create_project(project_input("survivor")).await?;
    let g = groups.create_group(group_input(doomed.id, "g", 0, None)).await?;
    let sub = groups
        .create_group(group_input(doomed.id, "sub", 0, Some(g.id)))
        .await?;
    layers.create_layer(layer_input(sub.id, "layer", 0)).await?;
    let s = groups.create_group(group_input(survivor.id, "s", 0, None)).await?;
    layers.create_layer(layer_input(s.id, "layer", 0)).await?;

    projects.delete_project(doomed.id).await?;

    assert!(matches!(
        projects.get_project(doomed.id).await,
        Err(CatalogError::NotFound { .. })
    ));
    assert_eq!(layer_groups::Entity::find().count(&db).await?, 1);
    assert_eq!(layers::Entity::find().count(&db).await?, 1);

    assert!(matches!(
        projects.delete_project(doomed.id).await,
        Err(CatalogError::NotFound { .. })
    ));

    Ok(())
}

#[tokio::test]
async fn test_project_short_key_rules() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let projects = ProjectService::new(db.clone());
    let groups = LayerGroupService::new(db.clone());

    let eco = projects.create_project(project_input("eco")).await?;
    let err = projects.create_project(project_input("eco")).await.unwrap_err();
    assert!(matches!(err, CatalogError::Conflict(_)));

    // Free to rename while no groups reference it
    let renamed = projects
        .update_project(
            eco.id,
            ProjectPatch {
                short_key: Some("eco2".to_string()),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(renamed.short_key, "eco2");
    assert_eq!(projects.get_project_by_short_key("eco2").await?.id, eco.id);

    groups.create_group(group_input(eco.id, "g", 0, None)).await?;
    let err = projects
        .update_project(
            eco.id,
            ProjectPatch {
                short_key: Some("eco3".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Validation { .. }));

    let listed: Vec<String> = projects
        .list_projects()
        .await?
        .into_iter()
        .map(|p| p.short_key)
        .collect();
    assert_eq!(listed, vec!["eco2"]);

    Ok(())
}

#[tokio::test]
async fn test_project_update_applies_all_or_nothing() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let projects = ProjectService::new(db.clone());
    let groups = LayerGroupService::new(db.clone());

    let eco = projects.create_project(project_input("eco")).await?;
    projects.create_project(project_input("taken")).await?;

    // Rename collides: the name change in the same patch is not kept
    let err = projects
        .update_project(
            eco.id,
            ProjectPatch {
                short_key: Some("taken".to_string()),
                name: Some("Renamed".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Conflict(_)));
    let stored = projects.get_project(eco.id).await?;
    assert_eq!(stored.short_key, "eco");
    assert_eq!(stored.name, "Project eco");

    // Resending the current key is not a change, even with groups present
    groups.create_group(group_input(eco.id, "g", 0, None)).await?;
    let updated = projects
        .update_project(
            eco.id,
            ProjectPatch {
                short_key: Some("eco".to_string()),
                name: Some("Ecosistemas".to_string()),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(updated.name, "Ecosistemas");

    let err = projects
        .update_project(
            eco.id,
            ProjectPatch {
                short_key: Some("eco-new".to_string()),
                zoom_level: Some(8.0),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Validation { field: Some(ref f), .. } if f == "short_key"));
    assert_eq!(projects.get_project(eco.id).await?.zoom_level, 6.0);

    // The connection is usable again after the rolled-back attempts
    assert!(matches!(
        projects.update_project(999, ProjectPatch::default()).await,
        Err(CatalogError::NotFound { .. })
    ));

    Ok(())
}

#[tokio::test]
async fn test_project_validation_and_defaults() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let projects = ProjectService::new(db.clone());

    let mut input = project_input("maps");
    input.base_map = Some("terrain".to_string());
    input.logo_small_url = Some("https://example.org/logo.png".to_string());
    let project = projects.create_project(input).await?;
    assert_eq!(project.get_base_map(), Some(BaseMap::Terrain));
    assert_eq!(project.zoom_level, 6.0);

    let mut bad = project_input("bad");
    bad.zoom_level = 40.0;
    assert!(matches!(
        projects.create_project(bad).await,
        Err(CatalogError::Validation { .. })
    ));

    let mut bad = project_input("bad");
    bad.logo_full_url = Some("ftp://example.org/logo.png".to_string());
    assert!(projects.create_project(bad).await.is_err());

    let cleared = projects
        .update_project(
            project.id,
            ProjectPatch {
                logo_small_url: Some(None),
                ..Default::default()
            },
        )
        .await?;
    assert!(cleared.logo_small_url.is_none());

    Ok(())
}

#[tokio::test]
async fn test_eligible_parents_exclude_subtree() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let project = ProjectService::new(db.clone())
        .create_project(project_input("eco"))
        .await?;
    let groups = LayerGroupService::new(db.clone());

    let a = groups.create_group(group_input(project.id, "A", 0, None)).await?;
    let b = groups
        .create_group(group_input(project.id, "B", 0, Some(a.id)))
        .await?;
    groups
        .create_group(group_input(project.id, "C", 0, Some(b.id)))
        .await?;
    let d = groups.create_group(group_input(project.id, "D", 1, None)).await?;

    let eligible: Vec<i32> = groups
        .eligible_parents(project.id, Some(b.id))
        .await?
        .into_iter()
        .map(|g| g.id)
        .collect();
    assert_eq!(eligible, vec![a.id, d.id]);

    assert_eq!(groups.eligible_parents(project.id, None).await?.len(), 4);

    Ok(())
}

#[tokio::test]
async fn test_default_layer_rules() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let projects = ProjectService::new(db.clone());
    let groups = LayerGroupService::new(db.clone());
    let layers = LayerService::new(db.clone());
    let defaults = DefaultLayerService::new(db.clone());

    let p1 = projects.create_project(project_input("p1")).await?;
    let p2 = projects.create_project(project_input("p2")).await?;
    let g1 = groups.create_group(group_input(p1.id, "g1", 0, None)).await?;
    let g2 = groups.create_group(group_input(p2.id, "g2", 0, None)).await?;
    let layer = layers.create_layer(layer_input(g1.id, "Cobertura", 0)).await?;

    let row = defaults
        .set_default_layer(p1.id, DefaultLayerInput { layer_id: layer.id, visible_default: false })
        .await?;
    assert!(!row.visible_default);

    let err = defaults
        .set_default_layer(p1.id, DefaultLayerInput { layer_id: layer.id, visible_default: true })
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Conflict(_)));

    let err = defaults
        .set_default_layer(p2.id, DefaultLayerInput { layer_id: layer.id, visible_default: true })
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::CrossProject(_)));

    // Pinned layers cannot leave their project
    let err = layers
        .update_layer(
            layer.id,
            LayerPatch {
                group_id: Some(g2.id),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::CrossProject(_)));

    let listed = defaults.list_default_layers(p1.id).await?;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].layer.display_name, "Cobertura");

    defaults.delete_default_layer(row.id).await?;
    assert!(defaults.list_default_layers(p1.id).await?.is_empty());

    // Once unpinned the move goes through
    let moved = layers
        .update_layer(
            layer.id,
            LayerPatch {
                group_id: Some(g2.id),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(moved.group_id, g2.id);

    Ok(())
}
