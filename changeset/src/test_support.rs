//! Fixtures shared by the unit tests.

use std::sync::Arc;
use tether_core::{attrs, EntityId, ValueKind};
use tether_graph::{EntityContainer, EntityRecord, LoadBehavior};
use tether_registry::{AssociationDef, MemberDef, Registry, RegistryBuilder};

/// Order 1..* Detail, with Detail holding the foreign key.
pub(crate) fn order_registry() -> Arc<Registry> {
    let mut builder = RegistryBuilder::new();
    builder
        .add_type("Order")
        .key(MemberDef::new("ID", ValueKind::Int))
        .member(MemberDef::new("Name", ValueKind::String).nullable())
        .member(MemberDef::new("Stamp", ValueKind::Int).nullable().read_only())
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

/// A container holding Order 1 with Details 10 and 11, all Unmodified.
pub(crate) fn loaded_orders() -> (EntityContainer, EntityId, EntityId, EntityId) {
    let mut c = EntityContainer::new(order_registry());
    let ids = c
        .load(
            vec![
                EntityRecord::new("Order", attrs! { "ID" => 1i64, "Name" => "first" }),
                EntityRecord::new("Detail", attrs! { "ID" => 10i64, "OrderID" => 1i64 }),
                EntityRecord::new("Detail", attrs! { "ID" => 11i64, "OrderID" => 1i64 }),
            ],
            LoadBehavior::default(),
        )
        .unwrap();
    (c, ids[0], ids[1], ids[2])
}
