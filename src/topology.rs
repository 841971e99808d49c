//! The shape of a network: layer sizes and per-layer activators.

use crate::activator::Activator;
use crate::error::{IndexError, Result, TopologyError};
use crate::utils::Back;

use serde::{de, Deserialize, Deserializer, Serialize};

/// An immutable description of a feed-forward network.
///
/// Layer 0 is the input layer and the last layer is the output layer. Every
/// layer after the input has its own activator, so `activators[i - 1]`
/// belongs to layer `i`.
///
/// Deserializing runs the same checks as [`Topology::new`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Topology {
    layer_sizes: Vec<usize>,
    activators: Vec<Activator>,
}

impl Topology {
    /// Creates a new topology.
    ///
    /// Arguments:
    ///
    ///  * `layer_sizes` - the number of nodes in each layer. Must contain at
    ///                    least 2 non-zero elements: an input layer and an
    ///                    output layer.
    ///  * `activators` - the activation function of every layer except the
    ///                   input layer.
    pub fn new(layer_sizes: &[usize], activators: &[Activator]) -> Result<Self> {
        if layer_sizes.len() < 2 {
            return Err(TopologyError::TooFewLayers(layer_sizes.len()).into());
        }
        if let Some(layer) = layer_sizes.iter().position(|&size| size == 0) {
            return Err(TopologyError::EmptyLayer(layer).into());
        }
        if activators.len() != layer_sizes.len() - 1 {
            return Err(TopologyError::ActivatorCount {
                expected: layer_sizes.len() - 1,
                actual: activators.len(),
            }
            .into());
        }
        Ok(Topology {
            layer_sizes: layer_sizes.into(),
            activators: activators.into(),
        })
    }

    /// Creates a topology where every hidden layer uses `hidden` and the
    /// output layer uses `output`.
    pub fn with_activators(
        layer_sizes: &[usize],
        hidden: Activator,
        output: Activator,
    ) -> Result<Self> {
        let hidden_layers = layer_sizes.len().saturating_sub(2);
        let mut activators = vec![hidden; hidden_layers];
        if !layer_sizes.is_empty() {
            activators.push(output);
        }
        Topology::new(layer_sizes, &activators)
    }

    /// Returns the number of layers, including the input and output layers.
    pub fn num_layers(&self) -> usize {
        self.layer_sizes.len()
    }

    pub fn layer_sizes(&self) -> &[usize] {
        &self.layer_sizes
    }

    /// Returns the number of nodes in `layer`.
    pub fn layer_size(&self, layer: usize) -> Result<usize> {
        self.check_layer(layer, 0)?;
        Ok(self.layer_sizes[layer])
    }

    /// Returns the size of the input layer.
    pub fn input_len(&self) -> usize {
        self.layer_sizes[0]
    }

    /// Returns the size of the output layer.
    pub fn output_len(&self) -> usize {
        *self.layer_sizes.back()
    }

    /// Returns the width of one training example: input followed by the
    /// expected output.
    pub fn example_len(&self) -> usize {
        self.input_len() + self.output_len()
    }

    /// Returns the activator of `layer`. The input layer has none.
    pub fn activator(&self, layer: usize) -> Result<Activator> {
        self.check_layer(layer, 1)?;
        Ok(self.activators[layer - 1])
    }

    pub fn activators(&self) -> &[Activator] {
        &self.activators
    }

    /// Errors unless `min <= layer < num_layers()`.
    pub(crate) fn check_layer(&self, layer: usize, min: usize) -> Result<()> {
        if layer < min || layer >= self.num_layers() {
            return Err(IndexError::Layer {
                layer,
                min,
                layers: self.num_layers(),
            }
            .into());
        }
        Ok(())
    }

    /// Errors unless `layer` has parameters and `node` is one of its nodes.
    pub(crate) fn check_node(&self, layer: usize, node: usize) -> Result<()> {
        self.check_layer(layer, 1)?;
        let len = self.layer_sizes[layer];
        if node >= len {
            return Err(IndexError::Node { layer, node, len }.into());
        }
        Ok(())
    }
}

impl<'de> Deserialize<'de> for Topology {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Fields {
            layer_sizes: Vec<usize>,
            activators: Vec<Activator>,
        }

        let fields = Fields::deserialize(deserializer)?;
        Topology::new(&fields.layer_sizes, &fields.activators).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serde::de::value::{self, MapDeserializer};

    fn deserialize(sizes: Vec<usize>) -> std::result::Result<Topology, value::Error> {
        // Activators are left empty: an empty list of integers reads as an
        // empty list of anything.
        let fields = vec![("layer_sizes", sizes), ("activators", Vec::new())];
        Topology::deserialize(MapDeserializer::new(fields.into_iter()))
    }

    #[test]
    fn too_few_layers() {
        assert_eq!(
            Topology::new(&[3], &[]),
            Err(Error::Topology(TopologyError::TooFewLayers(1)))
        );
        assert!(Topology::new(&[], &[]).is_err());
    }

    #[test]
    fn empty_layer() {
        assert_eq!(
            Topology::new(&[1, 0, 1], &[Activator::ReLU, Activator::ReLU]),
            Err(Error::Topology(TopologyError::EmptyLayer(1)))
        );
    }

    #[test]
    fn wrong_activator_count() {
        assert_eq!(
            Topology::new(&[2, 3, 1], &[Activator::TanH]),
            Err(Error::Topology(TopologyError::ActivatorCount {
                expected: 2,
                actual: 1,
            }))
        );
    }

    #[test]
    fn with_activators_assigns_output_last() {
        let topology =
            Topology::with_activators(&[4, 5, 6, 2], Activator::ReLU, Activator::Sigmoid)
                .unwrap();
        assert_eq!(
            topology.activators(),
            &[Activator::ReLU, Activator::ReLU, Activator::Sigmoid]
        );
        assert_eq!(topology.input_len(), 4);
        assert_eq!(topology.output_len(), 2);
        assert_eq!(topology.example_len(), 6);
    }

    #[test]
    fn input_layer_has_no_activator() {
        let topology = Topology::with_activators(&[2, 1], Activator::TanH, Activator::TanH).unwrap();
        assert!(matches!(topology.activator(0), Err(Error::Index(_))));
        assert_eq!(topology.activator(1), Ok(Activator::TanH));
        assert!(topology.activator(2).is_err());
    }

    #[test]
    fn deserializing_validates() {
        let empty = deserialize(vec![]).unwrap_err();
        assert!(empty.to_string().contains("at least 2"), "{}", empty);
        assert!(deserialize(vec![2, 0, 1]).is_err());
        // Two layers need one activator.
        assert!(deserialize(vec![2, 1]).is_err());
    }
}
