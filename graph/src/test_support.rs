//! Schemas shared by the unit tests.

use std::sync::Arc;
use tether_core::ValueKind;
use tether_registry::{AssociationDef, MemberDef, Registry, RegistryBuilder};

/// Order 1..* Detail, with Detail holding the foreign key.
pub(crate) fn order_registry() -> Arc<Registry> {
    let mut builder = RegistryBuilder::new();
    builder
        .add_type("Order")
        .key(MemberDef::new("ID", ValueKind::Int))
        .member(MemberDef::new("Name", ValueKind::String).nullable())
        .member(MemberDef::new("Total", ValueKind::Int).nullable())
        .association(AssociationDef::collection("Details", "Detail").key_pair("ID", "OrderID"))
        .done()
        .unwrap();
    builder
        .add_type("Detail")
        .key(MemberDef::new("ID", ValueKind::Int))
        .member(MemberDef::new("OrderID", ValueKind::Int).nullable())
        .association(
            AssociationDef::reference("Order", "Order")
                .key_pair("OrderID", "ID")
                .foreign_key(),
        )
        .done()
        .unwrap();
    Arc::new(builder.build().unwrap())
}

/// Parent keyed by (ID1, ID2); adding a Child to `Children` writes its
/// foreign key.
pub(crate) fn composite_registry() -> Arc<Registry> {
    let mut builder = RegistryBuilder::new();
    builder
        .add_type("Parent")
        .key(MemberDef::new("ID1", ValueKind::Int))
        .key(MemberDef::new("ID2", ValueKind::Int))
        .association(
            AssociationDef::collection("Children", "Child")
                .key_pair("ID1", "ParentID1")
                .key_pair("ID2", "ParentID2")
                .insertion_implies_association(),
        )
        .done()
        .unwrap();
    builder
        .add_type("Child")
        .key(MemberDef::new("ID", ValueKind::Int))
        .member(MemberDef::new("ParentID1", ValueKind::Int).nullable())
        .member(MemberDef::new("ParentID2", ValueKind::Int).nullable())
        .association(
            AssociationDef::reference("Parent", "Parent")
                .key_pair("ParentID1", "ID1")
                .key_pair("ParentID2", "ID2")
                .foreign_key(),
        )
        .done()
        .unwrap();
    Arc::new(builder.build().unwrap())
}
