pub mod networks {
    pub const MAINNET: u64 = 1;
    /// Network id of the ganache snapshot with the exchange contracts
    /// pre-deployed.
    pub const GANACHE: u64 = 50;
}

crate::bindings!(
    Exchange {
        struct Order {
            address makerAddress;
            address takerAddress;
            address feeRecipientAddress;
            address senderAddress;
            uint256 makerAssetAmount;
            uint256 takerAssetAmount;
            uint256 makerFee;
            uint256 takerFee;
            uint256 expirationTimeSeconds;
            uint256 salt;
            bytes makerAssetData;
            bytes takerAssetData;
        }

        struct FillResults {
            uint256 makerAssetFilledAmount;
            uint256 takerAssetFilledAmount;
            uint256 makerFeePaid;
            uint256 takerFeePaid;
        }

        struct OrderInfo {
            uint8 orderStatus;
            bytes32 orderHash;
            uint256 orderTakerAssetFilledAmount;
        }

        function fillOrder(
            Order memory order,
            uint256 takerAssetFillAmount,
            bytes memory signature
        ) external returns (FillResults memory fillResults);
        function cancelOrder(Order memory order) external;
        function getOrderInfo(Order memory order) external view returns (OrderInfo memory orderInfo);
        function getAssetProxy(bytes4 assetProxyId) external view returns (address);
        function ZRX_ASSET_DATA() external view returns (bytes memory);
    },
    maplit::hashmap! {
        MAINNET => address!("0x4f833a24e1f95d70f028921e27040ca56e09ab0b"),
        GANACHE => address!("0x48bacb9266a570d521063ef5dd96e61686dbe788"),
    }
);

crate::bindings!(ERC20 {
    function balanceOf(address owner) external view returns (uint256);
    function approve(address spender, uint256 value) external returns (bool);
});

crate::bindings!(
    WETH9 {
        function deposit() external payable;
    },
    maplit::hashmap! {
        MAINNET => address!("0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2"),
        GANACHE => address!("0x0b1ba0af832d7c05fd64161e0db78e85978e8082"),
    }
);

crate::bindings!(ERC721 {
    function balanceOf(address owner) external view returns (uint256);
    function mint(address to, uint256 tokenId) external;
    function setApprovalForAll(address operator, bool approved) external;
});

#[macro_export]
macro_rules! bindings {
    ($contract:ident { $($abi:tt)* } $(, $deployment_info:expr)?) => {
        paste::paste! {
            // Generate the main bindings in a private module. That allows
            // us to re-export all items in our own module while also adding
            // some items ourselves.
            #[allow(non_snake_case)]
            mod [<$contract Private>] {
                alloy::sol! {
                    #[allow(missing_docs)]
                    #[sol(rpc)]
                    interface $contract {
                        $($abi)*
                    }
                }
            }

            #[allow(non_snake_case)]
            pub mod $contract {
                use alloy::providers::DynProvider;

                pub use super::[<$contract Private>]::*;
                pub type Instance = $contract::[<$contract Instance>]<DynProvider>;

                $(
                use {
                    std::{sync::LazyLock, collections::HashMap},
                    alloy::primitives::{address, Address},
                    $crate::alloy::networks::*,
                };

                /// Deployed addresses keyed by network id.
                pub static DEPLOYMENT_INFO: LazyLock<HashMap<u64, Address>> = LazyLock::new(|| {
                    $deployment_info
                });

                /// Address of the contract on the given network.
                pub fn deployment_address(network_id: u64) -> Option<Address> {
                    DEPLOYMENT_INFO.get(&network_id).copied()
                }
                )*
            }
        }
    };
}
